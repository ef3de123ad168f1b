// src/exec/builtin.rs

//! Built-in worker kinds.
//!
//! - `echo` hands back its input together with the dependency payloads.
//! - `sleep` waits cooperatively and then succeeds or fails on request.
//! - `command` runs a shell command (see [`super::command`]).
//!
//! [`register_report_workers`] adds offline stand-ins for the kinds the
//! static planner emits.

use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use super::command::CommandWorker;
use super::worker::{Worker, WorkerContext, WorkerRegistry};
use crate::types::Payload;

pub fn register_builtins(registry: &mut WorkerRegistry) {
    registry
        .register("echo", || EchoWorker)
        .register("sleep", || SleepWorker)
        .register("command", || CommandWorker);
}

/// Register the `research`, `trends`, `insights` and `writer` stubs.
pub fn register_report_workers(registry: &mut WorkerRegistry) {
    registry
        .register("research", || ReportStub::Research)
        .register("trends", || ReportStub::Trends)
        .register("insights", || ReportStub::Insights)
        .register("writer", || ReportStub::Writer);
}

#[derive(Debug, Clone, Copy)]
pub struct EchoWorker;

impl Worker for EchoWorker {
    fn execute(&mut self, input: &Payload, ctx: &WorkerContext) -> anyhow::Result<Payload> {
        Ok(json!({
            "input": input,
            "dependencies": ctx.dependencies,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct SleepInput {
    ms: u64,
    #[serde(default)]
    fail: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SleepWorker;

impl Worker for SleepWorker {
    fn execute(&mut self, input: &Payload, ctx: &WorkerContext) -> anyhow::Result<Payload> {
        let input: SleepInput =
            serde_json::from_value(input.clone()).context("sleep input must be { ms, fail? }")?;

        ctx.sleep(Duration::from_millis(input.ms))?;

        match input.fail {
            Some(message) => bail!(message),
            None => Ok(json!({ "slept_ms": input.ms })),
        }
    }
}

/// Deterministic offline versions of the report pipeline's workers.
#[derive(Debug, Clone, Copy)]
pub enum ReportStub {
    Research,
    Trends,
    Insights,
    Writer,
}

impl Worker for ReportStub {
    fn execute(&mut self, input: &Payload, ctx: &WorkerContext) -> anyhow::Result<Payload> {
        let topic = input
            .get("topic")
            .and_then(Value::as_str)
            .context("input is missing a 'topic' string")?;

        let payload = match self {
            ReportStub::Research => {
                let findings: Vec<String> = ["background", "key players", "open problems"]
                    .iter()
                    .map(|area| format!("{area} of {topic}"))
                    .collect();
                json!({
                    "text": format!("Research on {topic} covered {} areas.", findings.len()),
                    "findings": findings,
                })
            }
            ReportStub::Trends => {
                let findings = dependency_list(ctx, "findings");
                let trends: Vec<String> = findings
                    .iter()
                    .map(|f| format!("growing attention to {f}"))
                    .collect();
                json!({
                    "text": format!("{} trends identified for {topic}.", trends.len()),
                    "trends": trends,
                })
            }
            ReportStub::Insights => {
                let findings = dependency_list(ctx, "findings");
                let trends = dependency_list(ctx, "trends");
                let insights: Vec<String> = findings
                    .iter()
                    .zip(&trends)
                    .map(|(f, t)| format!("{f}: {t}"))
                    .collect();
                json!({
                    "text": format!(
                        "{} insights drawn from {} findings and {} trends on {topic}.",
                        insights.len(),
                        findings.len(),
                        trends.len()
                    ),
                    "insights": insights,
                })
            }
            ReportStub::Writer => {
                let sections: Vec<&str> = ctx
                    .dependencies
                    .values()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect();
                let sources: Vec<&String> = ctx.dependencies.keys().collect();
                json!({
                    "text": format!("Summary on {topic}. {}", sections.join(" ")),
                    "sources": sources,
                })
            }
        };
        Ok(payload)
    }
}

/// All string entries of array `field` across the dependency payloads.
fn dependency_list(ctx: &WorkerContext, field: &str) -> Vec<String> {
    ctx.dependencies
        .values()
        .filter_map(|p| p.get(field).and_then(Value::as_array))
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}
