// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod report;
pub mod types;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, OutputFormat};
use crate::config::{load_and_validate, plan_id_from_path};
use crate::dag::TaskGraph;
use crate::engine::{ResultSet, ScheduleOptions, TracingSink, schedule_with};
use crate::exec::{WorkerRegistry, register_report_workers};
use crate::types::format_duration;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading (plan file or the static topic planner)
/// - the worker registry
/// - the scheduler runtime
/// - report output
///
/// Returns `true` when every subtask succeeded (or nothing ran).
pub async fn run(args: CliArgs) -> Result<bool> {
    let (graph, mut options) = match &args.topic {
        Some(topic) => (plan::simple_plan(topic)?, ScheduleOptions::default()),
        None => {
            let plan = load_and_validate(&args.plan)
                .with_context(|| format!("loading plan file {}", args.plan.display()))?;
            let graph = plan.to_graph(&plan_id_from_path(&args.plan))?;
            (graph, plan.schedule_options())
        }
    };

    if let Some(max) = args.max_concurrency {
        options.max_concurrency = max;
    }
    if let Some(timeout) = args.default_timeout {
        options.default_timeout = Some(timeout);
    }
    options.validate()?;

    if args.dry_run {
        print_dry_run(&graph, &options);
        return Ok(true);
    }

    let mut registry = WorkerRegistry::with_builtins();
    register_report_workers(&mut registry);
    debug!(kinds = ?registry.kinds(), "worker registry ready");

    let results = schedule_with(&graph, Arc::new(registry), options, Arc::new(TracingSink)).await?;

    let rendered = render(&graph, &results, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("writing output to {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => print!("{rendered}"),
    }

    Ok(results.all_succeeded())
}

fn render(graph: &TaskGraph, results: &ResultSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(report::render_markdown(graph, results)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(results)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Simple dry-run output: print subtasks, kinds, deps and timeouts.
fn print_dry_run(graph: &TaskGraph, options: &ScheduleOptions) {
    println!("taskswarm dry-run");
    println!("  plan_id = {:?}", graph.id());
    println!("  max_concurrency = {}", options.max_concurrency);
    if let Some(timeout) = options.default_timeout {
        println!("  default_timeout = {}", format_duration(timeout));
    }
    println!();

    println!("subtasks ({}):", graph.len());
    for subtask in graph.subtasks() {
        println!("  - {}", subtask.id);
        println!("      kind: {}", subtask.kind);
        if !subtask.dependencies.is_empty() {
            println!("      after: {:?}", subtask.dependencies);
        }
        if let Some(timeout) = subtask.timeout {
            println!("      timeout: {}", format_duration(timeout));
        }
    }

    debug!("dry-run complete (no execution)");
}
