use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;
use taskswarm::dag::ScheduledTask;
use taskswarm::engine::RuntimeEvent;
use taskswarm::errors::Result;
use taskswarm::exec::ExecutorBackend;

/// A fake executor that:
/// - records which subtasks were "run" and which were cancelled
/// - immediately reports a successful `TaskCompleted` for each scheduled
///   subtask, echoing the dependency ids it was given.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            cancelled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn cancelled(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.cancelled)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.id.clone());
                }

                let deps: Vec<&String> = t.dependencies.keys().collect();
                tx.send(RuntimeEvent::TaskCompleted {
                    subtask: t.id.clone(),
                    result: Ok(json!({ "id": t.id, "deps": deps })),
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel(&mut self, subtask: &str) {
        self.cancelled.lock().unwrap().push(subtask.to_string());
    }
}
