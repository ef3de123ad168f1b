// src/dag/mod.rs

//! Task graph representation and dependency-driven scheduling.
//!
//! - [`task_graph`] holds the immutable input: subtasks and their edges.
//! - [`graph`] indexes a task graph by declaration position.
//! - [`ready_queue`] is the declaration-ordered ready frontier.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   subtasks are ready, records outcomes and fails dependents.
//! - [`task_info`] provides subtask metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod ready_queue;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_graph;
pub mod task_info;

pub use graph::DagGraph;
pub use ready_queue::ReadyQueue;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_graph::{Subtask, TaskGraph};
pub use task_info::{ScheduledTask, TaskRunState};
