// src/engine/schedule.rs

//! Entry points that run a whole [`TaskGraph`] to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::{Scheduler, TaskGraph};
use crate::errors::Result;
use crate::exec::{WorkerPoolBackend, WorkerProvider};

use super::{CoreRuntime, ProgressSink, ResultSet, Runtime, ScheduleOptions, TracingSink};

/// Run every subtask of `graph` with at most `max_concurrency` in flight,
/// reporting progress through the log.
///
/// Individual subtask failures never make this return `Err`; they are
/// recorded in the returned [`ResultSet`]. Errors are reserved for invalid
/// options and a broken runtime.
pub async fn schedule(
    graph: &TaskGraph,
    provider: Arc<dyn WorkerProvider>,
    max_concurrency: usize,
    default_timeout: Option<Duration>,
) -> Result<ResultSet> {
    let options = ScheduleOptions::new(max_concurrency, default_timeout);
    schedule_with(graph, provider, options, Arc::new(TracingSink)).await
}

/// Like [`schedule`], with full options and an explicit progress sink.
pub async fn schedule_with(
    graph: &TaskGraph,
    provider: Arc<dyn WorkerProvider>,
    options: ScheduleOptions,
    sink: Arc<dyn ProgressSink>,
) -> Result<ResultSet> {
    options.validate()?;

    info!(
        plan_id = %graph.id(),
        subtasks = graph.len(),
        max_concurrency = options.max_concurrency,
        "scheduling task graph"
    );

    // Every subtask completes at most once, so a buffer of one slot per
    // subtask means workers never wait on the coordinator.
    let (event_tx, event_rx) = mpsc::channel(graph.len().max(1));

    let backend = WorkerPoolBackend::new(provider, event_tx);
    let core = CoreRuntime::new(Scheduler::new(graph), options);
    let runtime = Runtime::new(core, event_rx, backend, sink);

    runtime.run().await
}
