// src/engine/progress.rs

//! Advisory progress notifications.
//!
//! The runtime reports what it does through an injected [`ProgressSink`]
//! rather than any process-wide state, so concurrent runs stay independent
//! and tests can observe dispatch order. Nothing in the scheduler depends on
//! a sink being present or doing anything.

use tracing::{info, warn};

use crate::engine::OutcomeStatus;
use crate::types::SubtaskId;

/// Something observable happened during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A subtask was handed to a worker.
    Dispatched { subtask: SubtaskId, kind: String },
    /// A subtask reached a terminal outcome.
    ///
    /// `reason` carries the failure text for failed subtasks.
    Completed {
        subtask: SubtaskId,
        status: OutcomeStatus,
        reason: Option<String>,
    },
    /// A timed-out subtask's worker was asked to stop.
    CancelRequested { subtask: SubtaskId },
    /// Every subtask has an outcome.
    RunFinished { succeeded: usize, failed: usize },
}

/// Receiver of [`ProgressEvent`]s.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// Default sink: turns progress events into log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Dispatched { subtask, kind } => {
                info!(subtask = %subtask, kind = %kind, "subtask started");
            }
            ProgressEvent::Completed {
                subtask,
                status: OutcomeStatus::Succeeded,
                ..
            } => {
                info!(subtask = %subtask, "subtask succeeded");
            }
            ProgressEvent::Completed {
                subtask,
                status: OutcomeStatus::Failed,
                reason,
            } => {
                warn!(
                    subtask = %subtask,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "subtask failed"
                );
            }
            ProgressEvent::CancelRequested { subtask } => {
                info!(subtask = %subtask, "cancellation requested");
            }
            ProgressEvent::RunFinished { succeeded, failed } => {
                info!(succeeded, failed, "run finished");
            }
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn notify(&self, _event: &ProgressEvent) {}
}
