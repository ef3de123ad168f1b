// src/dag/task_info.rs

//! Subtask metadata and per-run state.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dag::task_graph::Subtask;
use crate::engine::OutcomeStatus;
use crate::types::{Payload, SubtaskId};

/// Per-run state of a subtask (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started; waiting on dependencies or on a free slot.
    Pending,
    /// Dispatched to a worker; outcome not yet known.
    Running,
    /// Outcome recorded.
    Done(OutcomeStatus),
}

/// Public, read-only view of a subtask's run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl From<RunState> for TaskRunState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Pending => TaskRunState::Pending,
            RunState::Running => TaskRunState::Running,
            RunState::Done(OutcomeStatus::Succeeded) => TaskRunState::Succeeded,
            RunState::Done(OutcomeStatus::Failed) => TaskRunState::Failed,
        }
    }
}

/// Static subtask information plus scheduling bookkeeping.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: SubtaskId,
    pub kind: String,
    pub input: Payload,
    pub timeout: Option<Duration>,
    /// Dependencies that have not succeeded yet. Dangling dependency ids
    /// count here too, so they can never reach zero.
    pub remaining_deps: usize,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn from_subtask(subtask: &Subtask, remaining_deps: usize) -> Self {
        Self {
            id: subtask.id.clone(),
            kind: subtask.kind.clone(),
            input: subtask.input.clone(),
            timeout: subtask.timeout,
            remaining_deps,
            run_state: RunState::Pending,
        }
    }
}

/// Description of a subtask that the scheduler wants executed now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: SubtaskId,
    pub kind: String,
    pub input: Payload,
    /// Effective timeout. The pure scheduler fills in the subtask's own
    /// value; the engine applies the run default on top.
    pub timeout: Option<Duration>,
    /// Payloads of the direct dependencies, all of which have succeeded.
    pub dependencies: BTreeMap<SubtaskId, Payload>,
    /// Declaration index in the originating graph.
    pub seq: usize,
}
