// src/engine/mod.rs

//! Orchestration engine for taskswarm.
//!
//! This module ties together:
//! - the dependency scheduler ([`crate::dag::Scheduler`])
//! - the concurrency bound and per-subtask deadlines
//! - the main runtime event loop that reacts to worker completions and
//!   expiring deadlines
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]; [`schedule`] wires both to a worker provider.

use std::time::Duration;

use crate::errors::{Result, SwarmError};
use crate::types::{Payload, SubtaskId};

/// Concurrency bound used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// How long the coordinator waits at most before re-checking deadlines.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Maximum number of subtasks in flight at once. Must be at least 1.
    pub max_concurrency: usize,
    /// Timeout applied to subtasks that do not declare their own.
    pub default_timeout: Option<Duration>,
    /// Upper bound on how long the coordinator sleeps between checks.
    pub poll_interval: Duration,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ScheduleOptions {
    pub fn new(max_concurrency: usize, default_timeout: Option<Duration>) -> Self {
        Self {
            max_concurrency,
            default_timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Check the preconditions of a run.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SwarmError::InvalidOptions(
                "max_concurrency must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SwarmError::InvalidOptions(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Events flowing into the runtime from workers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker finished (successfully, with an error, or by failing to
    /// build) for the given subtask.
    TaskCompleted {
        subtask: SubtaskId,
        result: std::result::Result<Payload, FailureReason>,
    },
}

pub mod core;
pub mod event_handlers;
pub mod outcome;
pub mod progress;
pub mod runtime;
pub mod schedule;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use outcome::{FailureReason, Outcome, OutcomeStatus, ResultSet};
pub use progress::{NoopSink, ProgressEvent, ProgressSink, TracingSink};
pub use runtime::Runtime;
pub use schedule::{schedule, schedule_with};
