// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and clock readings and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! On top of the dependency [`Scheduler`] it owns the two pieces of policy
//! that involve time and capacity: the concurrency bound and per-subtask
//! deadlines. The current time is always passed in, so the core can be
//! unit tested without Tokio, channels, threads, or sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    fill_free_slots, handle_expired_deadlines, handle_task_completion, CoreStep,
};
use crate::engine::{ResultSet, RuntimeEvent, ScheduleOptions};
use crate::types::SubtaskId;

/// Bookkeeping for one dispatched subtask.
#[derive(Debug, Clone, Copy)]
pub struct InFlight {
    /// Declaration index; orders simultaneous expiries.
    pub seq: usize,
    /// Effective timeout (own value, else the run default).
    pub timeout: Option<Duration>,
    pub deadline: Option<Instant>,
}

/// Pure core runtime state.
///
/// This owns:
/// - the dependency scheduler
/// - the set of in-flight subtasks with their deadlines
/// - run options (concurrency bound, default timeout)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    in_flight: HashMap<SubtaskId, InFlight>,
    options: ScheduleOptions,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: ScheduleOptions) -> Self {
        Self {
            scheduler,
            in_flight: HashMap::new(),
            options,
        }
    }

    /// Dispatch the initial ready frontier.
    pub fn start(&mut self, now: Instant) -> CoreStep {
        fill_free_slots(&mut self.scheduler, &mut self.in_flight, &self.options, now)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: Instant) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { subtask, result } => handle_task_completion(
                &mut self.scheduler,
                &mut self.in_flight,
                &self.options,
                subtask,
                result,
                now,
            ),
        }
    }

    /// Time out every in-flight subtask whose deadline has passed.
    pub fn expire_deadlines(&mut self, now: Instant) -> CoreStep {
        handle_expired_deadlines(&mut self.scheduler, &mut self.in_flight, &self.options, now)
    }

    /// Earliest deadline among in-flight subtasks, if any has one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.in_flight.values().filter_map(|f| f.deadline).min()
    }

    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Expose the scheduler (for tests and diagnostics).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Consume the core and return the result set.
    pub fn into_results(self) -> ResultSet {
        self.scheduler.into_results()
    }
}
