use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::ready_queue::ReadyQueue;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_graph::TaskGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{FailureReason, Outcome, ResultSet};
use crate::types::{Payload, SubtaskId};

/// Scheduler holds the immutable dependency index plus mutable per-run state.
///
/// It is responsible for:
/// - tracking which subtasks are pending, running and done
/// - maintaining the ready frontier incrementally (one dependency counter
///   per subtask, decremented as dependencies succeed)
/// - recording outcomes in completion order
/// - failing dependents when a subtask fails
/// - force-resolving the remainder when no progress is possible
///
/// It performs no IO and knows nothing about time; timeouts and the
/// concurrency bound are applied by [`crate::engine::CoreRuntime`].
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: Vec<TaskInfo>,
    ready: ReadyQueue,
    results: ResultSet,
    pending: usize,
    running: usize,
}

impl Scheduler {
    /// Construct a scheduler for one run over `graph`.
    pub fn new(graph: &TaskGraph) -> Self {
        let dag = DagGraph::from_graph(graph);
        let mut ready = ReadyQueue::new();

        let tasks: Vec<TaskInfo> = graph
            .subtasks()
            .iter()
            .enumerate()
            .map(|(idx, subtask)| {
                let remaining = dag.dependencies_of(idx).len() + dag.dangling_of(idx).len();
                if remaining == 0 {
                    ready.push(idx);
                }
                TaskInfo::from_subtask(subtask, remaining)
            })
            .collect();

        debug!(
            graph = %graph.id(),
            subtasks = tasks.len(),
            initially_ready = ready.len(),
            "scheduler: initialised run"
        );

        Self {
            pending: tasks.len(),
            graph: dag,
            tasks,
            ready,
            results: ResultSet::new(),
            running: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    /// Number of pending subtasks whose dependencies have all succeeded.
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Returns `true` once every subtask has an outcome.
    pub fn is_finished(&self) -> bool {
        self.pending == 0 && self.running == 0
    }

    /// Pending work remains but nothing is running and nothing is ready.
    pub fn is_stalled(&self) -> bool {
        self.pending > 0 && self.running == 0 && self.ready.is_empty()
    }

    /// Subtask ids in declaration order.
    pub fn subtask_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.ids()
    }

    /// Read-only view of the given subtask's run state.
    pub fn run_state_of(&self, id: &str) -> Option<TaskRunState> {
        let idx = self.graph.index_of(id)?;
        Some(self.tasks[idx].run_state.into())
    }

    /// Whether every dependency of `id` has succeeded.
    ///
    /// Returns `None` if the subtask is unknown.
    pub fn deps_satisfied(&self, id: &str) -> Option<bool> {
        let idx = self.graph.index_of(id)?;
        Some(ReadOnlyStateManager::new(&self.graph, &self.tasks).deps_satisfied(idx))
    }

    /// Outcomes recorded so far, in completion order.
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Consume the scheduler and hand back its result set.
    pub fn into_results(self) -> ResultSet {
        debug_assert!(
            !self.is_finished() || self.results.len() == self.tasks.len(),
            "finished run must have one outcome per subtask"
        );
        self.results
    }

    /// Take up to `limit` ready subtasks in declaration order and mark them
    /// `Running`.
    pub fn take_ready(&mut self, limit: usize) -> Vec<ScheduledTask> {
        let indices = self.ready.take(limit);
        let mut scheduled = Vec::with_capacity(indices.len());

        for idx in indices {
            let dependencies = self.dependency_payloads(idx);
            let info = &mut self.tasks[idx];
            info.run_state = RunState::Running;
            self.pending -= 1;
            self.running += 1;

            info!(subtask = %info.id, kind = %info.kind, "dispatching subtask");

            scheduled.push(ScheduledTask {
                id: info.id.clone(),
                kind: info.kind.clone(),
                input: info.input.clone(),
                timeout: info.timeout,
                dependencies,
                seq: idx,
            });
        }

        scheduled
    }

    /// Handle the completion of a running subtask.
    ///
    /// Completions for unknown subtasks, or for subtasks that are not
    /// currently running (e.g. already resolved by a timeout), are discarded.
    pub fn handle_completion(
        &mut self,
        id: &str,
        result: Result<Payload, FailureReason>,
    ) -> SchedulerStep {
        let Some(idx) = self.graph.index_of(id) else {
            warn!(subtask = %id, "completion for unknown subtask; ignoring");
            return SchedulerStep::ignored();
        };

        if self.tasks[idx].run_state != RunState::Running {
            debug!(
                subtask = %id,
                state = ?self.tasks[idx].run_state,
                "completion for subtask that is not running; discarding"
            );
            return SchedulerStep::ignored();
        }

        self.running -= 1;

        let mut manager = StateManager::new(
            &self.graph,
            &mut self.tasks,
            &mut self.ready,
            &mut self.results,
        );

        let (newly_ready, newly_failed) = match result {
            Ok(payload) => {
                debug!(subtask = %id, "subtask succeeded");
                manager.record(idx, Outcome::succeeded(id, payload));
                (manager.release_dependents(idx), Vec::new())
            }
            Err(reason) => {
                warn!(subtask = %id, reason = %reason, "subtask failed; failing dependents");
                manager.record(idx, Outcome::failed(id, reason));
                (Vec::new(), manager.mark_dependents_failed(idx))
            }
        };

        self.pending -= newly_failed.len();

        SchedulerStep {
            recorded: true,
            newly_ready: self.ids_of(&newly_ready),
            newly_failed: self.ids_of(&newly_failed),
            run_just_finished: self.is_finished(),
        }
    }

    /// No-progress guard.
    ///
    /// If the run is stalled, every remaining pending subtask is resolved as
    /// failed with unmet dependencies. Otherwise this is a no-op.
    pub fn resolve_stalled(&mut self) -> SchedulerStep {
        if !self.is_stalled() {
            return SchedulerStep::ignored();
        }

        if let Some(cycle) = self.graph.find_cycle() {
            warn!(?cycle, "dependency cycle detected");
        }
        warn!(
            pending = self.pending,
            "no runnable subtasks remain; resolving the rest as unmet dependencies"
        );

        let mut manager = StateManager::new(
            &self.graph,
            &mut self.tasks,
            &mut self.ready,
            &mut self.results,
        );
        let resolved = manager.force_resolve_pending();
        self.pending -= resolved.len();

        SchedulerStep {
            recorded: true,
            newly_ready: Vec::new(),
            newly_failed: self.ids_of(&resolved),
            run_just_finished: self.is_finished(),
        }
    }

    fn dependency_payloads(&self, idx: usize) -> BTreeMap<SubtaskId, Payload> {
        self.graph
            .dependencies_of(idx)
            .iter()
            .filter_map(|&d| {
                let id = self.graph.id_of(d);
                let payload = self.results.get(id)?.payload()?.clone();
                Some((id.to_string(), payload))
            })
            .collect()
    }

    fn ids_of(&self, indices: &[usize]) -> Vec<SubtaskId> {
        indices
            .iter()
            .map(|&i| self.graph.id_of(i).to_string())
            .collect()
    }
}
