// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::{Result, SwarmError};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, ProgressSink, ResultSet, RuntimeEvent};

/// What woke the loop up.
enum Wake {
    Event(Option<RuntimeEvent>),
    Tick,
}

/// Drives the scheduling core in response to `RuntimeEvent`s and the clock,
/// and delegates actual subtask execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, sleeping until the next deadline and dispatching subtasks to
/// the executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    sink: Arc<dyn ProgressSink>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            sink,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the initial ready frontier.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Wakes up at least every poll interval (or at the next deadline) to
    ///   expire timed-out subtasks.
    /// - Executes commands returned by the core (spawn, cancel, notify).
    ///
    /// Returns the complete result set once every subtask has an outcome.
    pub async fn run(mut self) -> Result<ResultSet> {
        info!(subtasks = self.core.scheduler().len(), "taskswarm runtime started");

        let step = self.core.start(Instant::now());
        let mut keep_running = self.execute_step(step).await?;

        while keep_running {
            let wake_at = self.wake_deadline();

            let wake = tokio::select! {
                event = self.event_rx.recv() => Wake::Event(event),
                _ = sleep_until(wake_at.into()) => Wake::Tick,
            };

            let step = match wake {
                Wake::Event(Some(event)) => {
                    debug!(?event, "runtime received event");
                    let now = Instant::now();
                    let step = self.core.step(event, now);
                    if step.keep_running {
                        // Deadlines may have passed while we were busy.
                        let expired = self.core.expire_deadlines(now);
                        merge_steps(step, expired)
                    } else {
                        step
                    }
                }
                Wake::Event(None) => {
                    return Err(SwarmError::Other(anyhow::anyhow!(
                        "runtime event channel closed with {} subtask(s) in flight",
                        self.core.in_flight_count()
                    )));
                }
                Wake::Tick => self.core.expire_deadlines(Instant::now()),
            };

            keep_running = self.execute_step(step).await?;
        }

        info!("runtime exiting");
        Ok(self.core.into_results())
    }

    /// Earliest of "next deadline" and "now + poll interval".
    fn wake_deadline(&self) -> Instant {
        let poll = Instant::now() + self.core.options().poll_interval;
        match self.core.next_deadline() {
            Some(deadline) if deadline < poll => deadline,
            _ => poll,
        }
    }

    async fn execute_step(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        if !step.keep_running {
            info!("core requested exit; stopping runtime");
        }
        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::Cancel(subtask) => {
                debug!(subtask = %subtask, "cancelling subtask");
                self.executor.cancel(&subtask);
            }
            CoreCommand::Notify(event) => {
                self.sink.notify(&event);
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        debug!(?ids, "spawning ready subtasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

fn merge_steps(mut first: CoreStep, second: CoreStep) -> CoreStep {
    first.commands.extend(second.commands);
    first.keep_running = second.keep_running;
    first
}
