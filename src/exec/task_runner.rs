// src/exec/task_runner.rs

//! Individual subtask runner.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::dag::ScheduledTask;
use crate::engine::{FailureReason, RuntimeEvent};
use crate::types::Payload;

use super::worker::{WorkerContext, WorkerProvider};

/// Build and run the worker for one subtask, then report the result.
///
/// Runs on a blocking thread. Exactly one `TaskCompleted` event is sent per
/// call; a build failure, an error and a panic all turn into failures. If
/// the coordinator already gave up on the subtask it discards the event.
pub fn run_subtask(
    task: ScheduledTask,
    provider: Arc<dyn WorkerProvider>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel: CancellationToken,
    runtime: Handle,
) {
    let subtask = task.id.clone();
    let result = execute(task, provider.as_ref(), cancel, runtime);

    if runtime_tx
        .blocking_send(RuntimeEvent::TaskCompleted {
            subtask: subtask.clone(),
            result,
        })
        .is_err()
    {
        debug!(subtask = %subtask, "runtime gone; dropping subtask result");
    }
}

fn execute(
    task: ScheduledTask,
    provider: &dyn WorkerProvider,
    cancel: CancellationToken,
    runtime: Handle,
) -> Result<Payload, FailureReason> {
    let mut worker = provider.build(&task.kind).map_err(|err| {
        warn!(subtask = %task.id, kind = %task.kind, error = %err, "worker build failed");
        FailureReason::WorkerBuild {
            message: err.to_string(),
        }
    })?;

    let ctx = WorkerContext::new(
        task.id.clone(),
        task.kind.clone(),
        task.dependencies,
        cancel,
        runtime,
    );
    debug!(subtask = %task.id, kind = %task.kind, "worker starting");

    match panic::catch_unwind(AssertUnwindSafe(|| worker.execute(&task.input, &ctx))) {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(err)) => {
            debug!(subtask = %task.id, error = %err, "worker returned an error");
            Err(FailureReason::WorkerExecution {
                message: format!("{err:#}"),
            })
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(subtask = %task.id, panic = %message, "worker panicked");
            Err(FailureReason::WorkerExecution {
                message: format!("worker panicked: {message}"),
            })
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
