// src/dag/state_manager.rs

//! Per-run state transitions for subtasks in the scheduler.

use tracing::{debug, warn};

use crate::dag::DagGraph;
use crate::dag::ready_queue::ReadyQueue;
use crate::dag::task_info::{RunState, TaskInfo};
use crate::engine::{FailureReason, Outcome, OutcomeStatus, ResultSet};
use crate::types::SubtaskId;

/// Manages per-run state transitions for subtasks.
///
/// Borrows the scheduler's pieces separately so a transition can update the
/// task table, the ready queue and the result set in one go.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut [TaskInfo],
    ready: &'a mut ReadyQueue,
    results: &'a mut ResultSet,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut [TaskInfo],
        ready: &'a mut ReadyQueue,
        results: &'a mut ResultSet,
    ) -> Self {
        Self {
            graph,
            tasks,
            ready,
            results,
        }
    }

    /// Record a terminal outcome for `idx` and move it to `Done`.
    pub fn record(&mut self, idx: usize, outcome: Outcome) {
        let info = &mut self.tasks[idx];
        info.run_state = RunState::Done(outcome.status());
        if !self.results.record(outcome) {
            warn!(subtask = %info.id, "outcome already recorded; keeping the first one");
        }
    }

    /// A dependency of these dependents just succeeded: decrement their
    /// counters and queue the ones that reached zero.
    ///
    /// Returns the indices that became ready.
    pub fn release_dependents(&mut self, idx: usize) -> Vec<usize> {
        let mut newly_ready = Vec::new();

        for &dep_idx in self.graph.dependents_of(idx) {
            let info = &mut self.tasks[dep_idx];
            if info.run_state != RunState::Pending {
                continue;
            }

            info.remaining_deps = info.remaining_deps.saturating_sub(1);
            if info.remaining_deps == 0 && self.ready.push(dep_idx) {
                debug!(subtask = %info.id, "all dependencies succeeded; queued as ready");
                newly_ready.push(dep_idx);
            }
        }

        newly_ready
    }

    /// Mark all pending dependents (and their transitive dependents) of a
    /// failed subtask as failed with unmet dependencies.
    ///
    /// Returns the indices that were newly failed, excluding `failed_idx`.
    pub fn mark_dependents_failed(&mut self, failed_idx: usize) -> Vec<usize> {
        let mut stack: Vec<usize> = self.graph.dependents_of(failed_idx).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(idx) = stack.pop() {
            if self.tasks[idx].run_state != RunState::Pending {
                // Already terminal, or (impossible with a failed dependency) running.
                continue;
            }

            let unmet = self.unmet_dependencies_of(idx);
            debug!(
                subtask = %self.tasks[idx].id,
                ?unmet,
                "failing dependent due to upstream failure"
            );
            let outcome = Outcome::failed(
                self.tasks[idx].id.clone(),
                FailureReason::UnmetDependencies { unmet },
            );
            self.record(idx, outcome);
            newly_failed.push(idx);
            stack.extend(self.graph.dependents_of(idx).iter().copied());
        }

        newly_failed.sort_unstable();
        newly_failed
    }

    /// Resolve every still-pending subtask as failed with unmet dependencies.
    ///
    /// Used by the no-progress guard. Returns the resolved indices in
    /// declaration order.
    pub fn force_resolve_pending(&mut self) -> Vec<usize> {
        let pending: Vec<usize> = (0..self.tasks.len())
            .filter(|&i| self.tasks[i].run_state == RunState::Pending)
            .collect();

        for &idx in &pending {
            let unmet = self.unmet_dependencies_of(idx);
            let outcome = Outcome::failed(
                self.tasks[idx].id.clone(),
                FailureReason::UnmetDependencies { unmet },
            );
            self.record(idx, outcome);
        }

        pending
    }

    /// Dependencies of `idx` that have not succeeded, including dangling ids.
    pub fn unmet_dependencies_of(&self, idx: usize) -> Vec<SubtaskId> {
        ReadOnlyStateManager::new(self.graph, &*self.tasks).unmet_dependencies_of(idx)
    }
}

/// A read-only view for dependency queries.
///
/// This is used when we only have shared access to the task table (e.g. in
/// `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a [TaskInfo],
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a [TaskInfo]) -> Self {
        Self { graph, tasks }
    }

    /// Whether every dependency of `idx` has succeeded in this run.
    pub fn deps_satisfied(&self, idx: usize) -> bool {
        self.graph.dangling_of(idx).is_empty()
            && self
                .graph
                .dependencies_of(idx)
                .iter()
                .all(|&d| self.tasks[d].run_state == RunState::Done(OutcomeStatus::Succeeded))
    }

    pub fn unmet_dependencies_of(&self, idx: usize) -> Vec<SubtaskId> {
        let mut unmet: Vec<SubtaskId> = self
            .graph
            .dependencies_of(idx)
            .iter()
            .filter(|&&d| self.tasks[d].run_state != RunState::Done(OutcomeStatus::Succeeded))
            .map(|&d| self.tasks[d].id.clone())
            .collect();
        unmet.extend(self.graph.dangling_of(idx).iter().cloned());
        unmet
    }
}
