// tests/cli_args.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use taskswarm::cli::{CliArgs, LogLevel, OutputFormat};
use taskswarm::logging::resolve_level;

#[test]
fn defaults() {
    let args = CliArgs::try_parse_from(["taskswarm"]).expect("no flags is valid");
    assert_eq!(args.plan, PathBuf::from("Swarm.toml"));
    assert_eq!(args.format, OutputFormat::Markdown);
    assert_eq!(args.max_concurrency, None);
    assert_eq!(args.default_timeout, None);
    assert!(!args.dry_run);
}

#[test]
fn overrides_are_parsed() {
    let args = CliArgs::try_parse_from([
        "taskswarm",
        "--topic",
        "rust",
        "--max-concurrency",
        "5",
        "--default-timeout",
        "750ms",
        "--format",
        "json",
        "--dry-run",
    ])
    .expect("valid flags");

    assert_eq!(args.topic.as_deref(), Some("rust"));
    assert_eq!(args.max_concurrency, Some(5));
    assert_eq!(args.default_timeout, Some(Duration::from_millis(750)));
    assert_eq!(args.format, OutputFormat::Json);
    assert!(args.dry_run);
}

#[test]
fn bad_timeout_is_a_parse_error() {
    assert!(CliArgs::try_parse_from(["taskswarm", "--default-timeout", "soon"]).is_err());
}

#[test]
fn log_level_priority() {
    assert_eq!(
        resolve_level(Some(LogLevel::Debug), Some("error")),
        tracing::Level::DEBUG
    );
    assert_eq!(resolve_level(None, Some("warning")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
