use std::time::Duration;

use serde_json::Value;
use taskswarm::dag::{Subtask, TaskGraph};

/// Builder for `TaskGraph` to simplify test setup.
pub struct TaskGraphBuilder {
    id: String,
    subtasks: Vec<Subtask>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self {
            id: "test-plan".to_string(),
            subtasks: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_subtask(mut self, subtask: SubtaskBuilder) -> Self {
        self.subtasks.push(subtask.build());
        self
    }

    /// Shorthand for a subtask of kind `kind` with the given dependencies.
    pub fn node(self, id: &str, kind: &str, after: &[&str]) -> Self {
        let mut builder = SubtaskBuilder::new(id, kind);
        for dep in after {
            builder = builder.after(dep);
        }
        self.with_subtask(builder)
    }

    pub fn build(self) -> TaskGraph {
        TaskGraph::new(self.id, self.subtasks).expect("Failed to build valid task graph")
    }
}

impl Default for TaskGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Subtask`.
pub struct SubtaskBuilder {
    subtask: Subtask,
}

impl SubtaskBuilder {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            subtask: Subtask::new(id, kind),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.subtask = self.subtask.after(dep);
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.subtask = self.subtask.with_input(input);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.subtask = self.subtask.with_timeout(timeout);
        self
    }

    pub fn build(self) -> Subtask {
        self.subtask
    }
}
