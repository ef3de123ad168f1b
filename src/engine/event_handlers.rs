// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::dag::{ScheduledTask, Scheduler};
use crate::engine::core::InFlight;
use crate::engine::{FailureReason, OutcomeStatus, ProgressEvent, ScheduleOptions};
use crate::types::{Payload, SubtaskId};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these subtasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Ask the worker of this subtask to stop; its result will be ignored.
    Cancel(SubtaskId),
    /// Forward a progress notification to the sink.
    Notify(ProgressEvent),
    /// Every subtask has an outcome; the run is over.
    RequestExit,
}

/// Decision returned by the core after handling a single input.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a worker completion.
///
/// A completion for a subtask that is no longer in flight (its deadline
/// already expired) is discarded without touching the scheduler.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    in_flight: &mut HashMap<SubtaskId, InFlight>,
    options: &ScheduleOptions,
    subtask: SubtaskId,
    result: Result<Payload, FailureReason>,
    now: Instant,
) -> CoreStep {
    if in_flight.remove(&subtask).is_none() {
        debug!(
            subtask = %subtask,
            "discarding result from a subtask that is no longer in flight"
        );
        return CoreStep {
            commands: Vec::new(),
            keep_running: !scheduler.is_finished(),
        };
    }

    let mut commands = Vec::new();
    let reason = result.as_ref().err().map(ToString::to_string);
    let status = if result.is_ok() {
        OutcomeStatus::Succeeded
    } else {
        OutcomeStatus::Failed
    };

    let step = scheduler.handle_completion(&subtask, result);
    if step.recorded {
        commands.push(CoreCommand::Notify(ProgressEvent::Completed {
            subtask,
            status,
            reason,
        }));
    }
    commands.extend(unmet_notifications(scheduler, &step.newly_failed));

    finish_with_free_slots(scheduler, in_flight, options, now, commands)
}

/// Resolve every in-flight subtask whose deadline is at or before `now` as
/// timed out and request cancellation of its worker.
pub fn handle_expired_deadlines(
    scheduler: &mut Scheduler,
    in_flight: &mut HashMap<SubtaskId, InFlight>,
    options: &ScheduleOptions,
    now: Instant,
) -> CoreStep {
    let mut expired: Vec<(usize, SubtaskId, u64)> = in_flight
        .iter()
        .filter_map(|(id, flight)| match (flight.deadline, flight.timeout) {
            (Some(deadline), Some(timeout)) if deadline <= now => {
                Some((flight.seq, id.clone(), timeout.as_millis() as u64))
            }
            _ => None,
        })
        .collect();
    expired.sort();

    let mut commands = Vec::new();

    for (_, subtask, after_ms) in expired {
        in_flight.remove(&subtask);
        warn!(subtask = %subtask, timeout_ms = after_ms, "subtask exceeded its timeout");

        let reason = FailureReason::Timeout { after_ms };
        let step = scheduler.handle_completion(&subtask, Err(reason.clone()));

        commands.push(CoreCommand::Cancel(subtask.clone()));
        commands.push(CoreCommand::Notify(ProgressEvent::CancelRequested {
            subtask: subtask.clone(),
        }));
        if step.recorded {
            commands.push(CoreCommand::Notify(ProgressEvent::Completed {
                subtask,
                status: OutcomeStatus::Failed,
                reason: Some(reason.to_string()),
            }));
        }
        commands.extend(unmet_notifications(scheduler, &step.newly_failed));
    }

    finish_with_free_slots(scheduler, in_flight, options, now, commands)
}

/// Dispatch as many ready subtasks as there are free slots, apply the
/// no-progress guard and decide whether the run is over.
pub fn fill_free_slots(
    scheduler: &mut Scheduler,
    in_flight: &mut HashMap<SubtaskId, InFlight>,
    options: &ScheduleOptions,
    now: Instant,
) -> CoreStep {
    finish_with_free_slots(scheduler, in_flight, options, now, Vec::new())
}

fn finish_with_free_slots(
    scheduler: &mut Scheduler,
    in_flight: &mut HashMap<SubtaskId, InFlight>,
    options: &ScheduleOptions,
    now: Instant,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let free = options.max_concurrency.saturating_sub(in_flight.len());
    let mut tasks = scheduler.take_ready(free);

    if !tasks.is_empty() {
        let mut dispatched = Vec::with_capacity(tasks.len());
        for task in &mut tasks {
            task.timeout = task.timeout.or(options.default_timeout);
            let deadline = task.timeout.and_then(|t| now.checked_add(t));
            in_flight.insert(
                task.id.clone(),
                InFlight {
                    seq: task.seq,
                    timeout: task.timeout,
                    deadline,
                },
            );
            dispatched.push(ProgressEvent::Dispatched {
                subtask: task.id.clone(),
                kind: task.kind.clone(),
            });
        }

        commands.push(CoreCommand::DispatchTasks(tasks));
        commands.extend(dispatched.into_iter().map(CoreCommand::Notify));
    }

    if scheduler.is_stalled() {
        let step = scheduler.resolve_stalled();
        commands.extend(unmet_notifications(scheduler, &step.newly_failed));
    }

    let keep_running = !scheduler.is_finished();
    if !keep_running {
        let results = scheduler.results();
        let succeeded = results.succeeded().count();
        commands.push(CoreCommand::Notify(ProgressEvent::RunFinished {
            succeeded,
            failed: results.len() - succeeded,
        }));
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Progress notifications for subtasks resolved as unmet dependencies.
fn unmet_notifications(scheduler: &Scheduler, ids: &[SubtaskId]) -> Vec<CoreCommand> {
    ids.iter()
        .map(|id| {
            let reason = scheduler
                .results()
                .get(id)
                .and_then(|o| o.reason())
                .map(ToString::to_string);
            CoreCommand::Notify(ProgressEvent::Completed {
                subtask: id.clone(),
                status: OutcomeStatus::Failed,
                reason,
            })
        })
        .collect()
}
