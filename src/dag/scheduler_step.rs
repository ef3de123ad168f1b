// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::types::SubtaskId;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Whether the completion was accepted. `false` for stale or unknown
    /// completions (e.g. a late result from a timed-out worker).
    pub recorded: bool,
    /// Subtasks that became ready to dispatch as a result of this step.
    pub newly_ready: Vec<SubtaskId>,
    /// Subtasks resolved as failed with unmet dependencies in this step.
    /// Does not include the subtask whose own completion was handled.
    pub newly_failed: Vec<SubtaskId>,
    /// Whether this step resolved the last outstanding subtask.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    pub(crate) fn ignored() -> Self {
        Self::default()
    }
}
