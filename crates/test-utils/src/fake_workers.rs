//! Scripted worker provider for runtime tests.
//!
//! Every kind maps to a [`Behaviour`]. The provider records which subtasks
//! actually started and tracks how many ran at the same time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use taskswarm::exec::{BuildError, Worker, WorkerContext, WorkerProvider};

/// What a scripted worker does when executed.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Return this payload immediately.
    Succeed(Value),
    /// Sleep cooperatively, then return `{ "slept_ms": n }`.
    Sleep(Duration),
    /// Return an error with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
    /// Sleep without ever looking at the cancellation flag.
    IgnoreCancel(Duration),
    /// Fail in the factory, before any worker exists.
    BuildFailure(String),
}

#[derive(Default)]
struct Shared {
    invocations: Mutex<Vec<String>>,
    seen_dependencies: Mutex<HashMap<String, Vec<String>>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// `WorkerProvider` whose workers follow a per-kind script.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    behaviours: HashMap<String, Behaviour>,
    shared: Arc<Shared>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(kind.to_string(), behaviour);
        self
    }

    /// Subtask ids whose worker started executing, in start order.
    pub fn invocations(&self) -> Vec<String> {
        self.shared.invocations.lock().unwrap().clone()
    }

    /// Dependency ids the worker of `subtask` received.
    pub fn dependencies_seen_by(&self, subtask: &str) -> Option<Vec<String>> {
        self.shared
            .seen_dependencies
            .lock()
            .unwrap()
            .get(subtask)
            .cloned()
    }

    /// Highest number of workers that were executing at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

impl WorkerProvider for ScriptedProvider {
    fn build(&self, kind: &str) -> Result<Box<dyn Worker>, BuildError> {
        let behaviour = self
            .behaviours
            .get(kind)
            .cloned()
            .ok_or_else(|| BuildError::UnknownKind(kind.to_string()))?;

        if let Behaviour::BuildFailure(message) = behaviour {
            return Err(BuildError::Construction {
                kind: kind.to_string(),
                message,
            });
        }

        Ok(Box::new(ScriptedWorker {
            behaviour,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedWorker {
    behaviour: Behaviour,
    shared: Arc<Shared>,
}

struct Gauge<'a>(&'a Shared);

impl<'a> Gauge<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.current.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak.fetch_max(now, Ordering::SeqCst);
        Gauge(shared)
    }
}

impl Drop for Gauge<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Worker for ScriptedWorker {
    fn execute(&mut self, _input: &Value, ctx: &WorkerContext) -> anyhow::Result<Value> {
        self.shared
            .invocations
            .lock()
            .unwrap()
            .push(ctx.subtask_id.clone());
        self.shared
            .seen_dependencies
            .lock()
            .unwrap()
            .insert(ctx.subtask_id.clone(), ctx.dependencies.keys().cloned().collect());

        let _gauge = Gauge::enter(&self.shared);

        match &self.behaviour {
            Behaviour::Succeed(payload) => Ok(payload.clone()),
            Behaviour::Sleep(duration) => {
                ctx.sleep(*duration)?;
                Ok(json!({ "slept_ms": duration.as_millis() as u64 }))
            }
            Behaviour::Fail(message) => Err(anyhow::anyhow!(message.clone())),
            Behaviour::Panic(message) => panic!("{message}"),
            Behaviour::IgnoreCancel(duration) => {
                std::thread::sleep(*duration);
                Ok(json!({ "ignored_cancel": true }))
            }
            Behaviour::BuildFailure(_) => unreachable!("rejected by the provider"),
        }
    }
}
