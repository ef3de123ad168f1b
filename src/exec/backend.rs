// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning workers
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production worker pool in [`WorkerPoolBackend`].
//!
//! - `WorkerPoolBackend` is the default implementation. It runs every
//!   scheduled subtask on Tokio's blocking pool and reports back through the
//!   runtime event channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which subtasks were scheduled and directly emits `TaskCompleted` events.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::types::SubtaskId;

use super::task_runner::run_subtask;
use super::worker::WorkerProvider;

/// Trait abstracting how scheduled subtasks are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given subtasks for execution.
    ///
    /// Each dispatched subtask must eventually produce at most one
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Ask a running subtask to stop. Best effort; whatever it reports
    /// afterwards is ignored by the runtime.
    fn cancel(&mut self, subtask: &str);
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Production backend: one blocking task per subtask.
pub struct WorkerPoolBackend {
    provider: Arc<dyn WorkerProvider>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    running: HashMap<SubtaskId, Running>,
}

impl WorkerPoolBackend {
    pub fn new(provider: Arc<dyn WorkerProvider>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            provider,
            runtime_tx,
            running: HashMap::new(),
        }
    }

    fn reap_finished(&mut self) {
        self.running.retain(|_, r| !r.handle.is_finished());
    }
}

impl ExecutorBackend for WorkerPoolBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.reap_finished();
            let runtime = Handle::current();

            for task in tasks {
                let id = task.id.clone();
                let cancel = CancellationToken::new();
                let provider = Arc::clone(&self.provider);
                let tx = self.runtime_tx.clone();
                let token = cancel.clone();
                let rt = runtime.clone();

                let handle = tokio::task::spawn_blocking(move || {
                    run_subtask(task, provider, tx, token, rt)
                });
                self.running.insert(id, Running { cancel, handle });
            }
            Ok(())
        })
    }

    fn cancel(&mut self, subtask: &str) {
        if let Some(running) = self.running.remove(subtask) {
            debug!(subtask = %subtask, "signalling worker cancellation");
            running.cancel.cancel();
        }
    }
}

impl Drop for WorkerPoolBackend {
    fn drop(&mut self) {
        // Anything still running belongs to a finished run.
        for running in self.running.values() {
            running.cancel.cancel();
        }
    }
}
