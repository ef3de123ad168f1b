// src/exec/worker.rs

//! Worker abstraction and the kind -> worker registry.
//!
//! A [`Worker`] is built fresh for every subtask by a [`WorkerProvider`] and
//! runs on a blocking thread, so it may do synchronous work freely. Async
//! work goes through [`WorkerContext::block_on`] on the scheduler's runtime.
//! Workers that run for a long time should look at
//! [`WorkerContext::is_cancelled`] (or use [`WorkerContext::sleep`]) so a
//! timed-out subtask stops promptly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;

use anyhow::bail;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::types::{Payload, SubtaskId};

/// Executes one subtask.
pub trait Worker: Send {
    /// Produce the subtask's output payload from its input.
    ///
    /// Returning `Err` records an execution failure for the subtask.
    fn execute(&mut self, input: &Payload, ctx: &WorkerContext) -> anyhow::Result<Payload>;
}

/// Why a worker could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no worker registered for kind '{0}'")]
    UnknownKind(String),

    #[error("failed to construct worker for kind '{kind}': {message}")]
    Construction { kind: String, message: String },
}

/// Builds workers by subtask kind.
pub trait WorkerProvider: Send + Sync {
    fn build(&self, kind: &str) -> Result<Box<dyn Worker>, BuildError>;
}

/// What a worker knows about the subtask it runs.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub subtask_id: SubtaskId,
    pub kind: String,
    /// Payloads of the direct dependencies, keyed by dependency id.
    pub dependencies: BTreeMap<SubtaskId, Payload>,
    cancel: CancellationToken,
    runtime: Handle,
}

impl WorkerContext {
    pub fn new(
        subtask_id: impl Into<SubtaskId>,
        kind: impl Into<String>,
        dependencies: BTreeMap<SubtaskId, Payload>,
        cancel: CancellationToken,
        runtime: Handle,
    ) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            kind: kind.into(),
            dependencies,
            cancel,
            runtime,
        }
    }

    /// Set once the coordinator has given up on this subtask.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `future` to completion on the scheduler's runtime.
    ///
    /// Only call this from the worker thread, never from async code.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Block for `duration`, returning early with an error on cancellation.
    pub fn sleep(&self, duration: Duration) -> anyhow::Result<()> {
        let cancel = self.cancel.clone();
        self.block_on(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => bail!("cancelled"),
                _ = tokio::time::sleep(duration) => Ok(()),
            }
        })
    }
}

type Factory = Arc<dyn Fn() -> Result<Box<dyn Worker>, String> + Send + Sync>;

/// Map from kind to worker factory. This is the standard [`WorkerProvider`].
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    factories: HashMap<String, Factory>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("WorkerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `echo`, `sleep` and `command` kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) an infallible factory for `kind`.
    pub fn register<F, W>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> W + Send + Sync + 'static,
        W: Worker + 'static,
    {
        self.factories.insert(
            kind.into(),
            Arc::new(move || Ok::<_, String>(Box::new(factory()) as Box<dyn Worker>)),
        );
        self
    }

    /// Register a factory whose construction may fail.
    pub fn register_fallible<F, W>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<W, String> + Send + Sync + 'static,
        W: Worker + 'static,
    {
        self.factories.insert(
            kind.into(),
            Arc::new(move || factory().map(|w| Box::new(w) as Box<dyn Worker>)),
        );
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl WorkerProvider for WorkerRegistry {
    fn build(&self, kind: &str) -> Result<Box<dyn Worker>, BuildError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| BuildError::UnknownKind(kind.to_string()))?;
        factory().map_err(|message| BuildError::Construction {
            kind: kind.to_string(),
            message,
        })
    }
}
