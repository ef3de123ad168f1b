// src/exec/mod.rs

//! Worker execution layer.
//!
//! This module is responsible for actually running subtasks and reporting
//! back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`worker`] defines the `Worker` / `WorkerProvider` seams and the
//!   kind-keyed `WorkerRegistry`.
//! - [`task_runner`] builds and runs one worker, turning errors and panics
//!   into failures.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `WorkerPoolBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.
//! - [`builtin`] and [`command`] hold the built-in worker kinds.

pub mod backend;
pub mod builtin;
pub mod command;
pub mod task_runner;
pub mod worker;

pub use backend::{ExecutorBackend, WorkerPoolBackend};
pub use builtin::{register_builtins, register_report_workers};
pub use worker::{BuildError, Worker, WorkerContext, WorkerProvider, WorkerRegistry};
