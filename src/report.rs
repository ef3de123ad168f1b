// src/report.rs

//! Markdown report assembly from a finished run.

use std::fmt::{self, Write};

use serde_json::Value;

use crate::dag::TaskGraph;
use crate::engine::ResultSet;

/// Render the outcomes of `graph` as markdown, one section per subtask in
/// declaration order. Output depends only on the inputs.
pub fn render_markdown(graph: &TaskGraph, results: &ResultSet) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    if write_report(&mut out, graph, results).is_err() {
        out.clear();
    }
    out
}

fn write_report(out: &mut String, graph: &TaskGraph, results: &ResultSet) -> fmt::Result {
    let succeeded = results.succeeded().count();
    let failed = results.failed().count();
    let missing = graph
        .subtasks()
        .iter()
        .filter(|s| !results.contains(&s.id))
        .count();

    writeln!(out, "# Report: {}", graph.id())?;
    writeln!(out)?;
    write!(
        out,
        "{} subtasks: {succeeded} succeeded, {failed} failed",
        graph.len()
    )?;
    if missing > 0 {
        write!(out, ", {missing} without result")?;
    }
    writeln!(out, ".")?;

    for subtask in graph.subtasks() {
        writeln!(out)?;
        writeln!(out, "## {} (task {})", title_case(&subtask.kind), subtask.id)?;
        writeln!(out)?;

        match results.get(&subtask.id) {
            Some(outcome) if outcome.is_success() => {
                let body = outcome.payload().map(render_payload).unwrap_or_default();
                writeln!(out, "{}", body.trim_end())?;
            }
            Some(outcome) => {
                let reason = outcome
                    .reason()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown".to_string());
                writeln!(out, "**FAILED**: {reason}")?;
            }
            None => writeln!(out, "_No result_")?,
        }
    }

    Ok(())
}

/// The payload's `text` field if it has one, else pretty-printed JSON.
fn render_payload(payload: &Value) -> String {
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    format!("```json\n{pretty}\n```")
}

fn title_case(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
