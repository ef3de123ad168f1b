// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::default_plan_path;
use crate::types::parse_duration;

/// Command-line arguments for `taskswarm`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskswarm",
    version,
    about = "Run a graph of dependent subtasks on a bounded worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    ///
    /// Default: `Swarm.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_plan_path())]
    pub plan: PathBuf,

    /// Ignore the plan file and run the built-in report pipeline for this
    /// topic.
    #[arg(long, value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Maximum number of subtasks running at once (overrides the plan file).
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Timeout for subtasks without their own, e.g. `30s` or `500ms`
    /// (overrides the plan file).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub default_timeout: Option<Duration>,

    /// What to print once the run is over.
    #[arg(long, value_enum, default_value = "markdown")]
    pub format: OutputFormat,

    /// Write the output to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSWARM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute any subtasks.
    #[arg(long)]
    pub dry_run: bool,
}

/// Output format for the finished run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown report, one section per subtask.
    Markdown,
    /// The result set as JSON, in completion order.
    Json,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
