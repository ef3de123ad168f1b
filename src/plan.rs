// src/plan.rs

//! Static planner for topic reports.

use serde_json::json;
use uuid::Uuid;

use crate::dag::{Subtask, TaskGraph};
use crate::errors::Result;

/// The fixed four-step report pipeline for `topic`:
///
/// ```text
/// t1 research
/// t2 trends    after t1
/// t3 insights  after t1, t2
/// t4 writer    after t3
/// ```
///
/// Every subtask gets `{ "topic": topic }` as input. The graph id is a fresh
/// UUID.
pub fn simple_plan(topic: &str) -> Result<TaskGraph> {
    let input = json!({ "topic": topic });

    let subtasks = vec![
        Subtask::new("t1", "research").with_input(input.clone()),
        Subtask::new("t2", "trends")
            .with_input(input.clone())
            .after("t1"),
        Subtask::new("t3", "insights")
            .with_input(input.clone())
            .after("t1")
            .after("t2"),
        Subtask::new("t4", "writer").with_input(input).after("t3"),
    ];

    TaskGraph::new(Uuid::new_v4().to_string(), subtasks)
}
