// src/dag/task_graph.rs

//! Immutable description of one plan run: subtasks plus dependency edges.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

use crate::errors::{Result, SwarmError};
use crate::types::{Payload, SubtaskId};

/// One unit of work with declared dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    /// Unique identifier within the graph.
    pub id: SubtaskId,
    /// Type tag selecting which worker handles this subtask.
    pub kind: String,
    /// Opaque structured payload for the worker.
    pub input: Payload,
    /// Ids of subtasks that must succeed before this one may run.
    pub dependencies: Vec<SubtaskId>,
    /// Maximum wall-clock duration; `None` falls back to the scheduler default.
    pub timeout: Option<Duration>,
}

impl Subtask {
    pub fn new(id: impl Into<SubtaskId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            input: Value::Null,
            dependencies: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_input(mut self, input: Payload) -> Self {
        self.input = input;
        self
    }

    pub fn after(mut self, dep: impl Into<SubtaskId>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ordered, immutable collection of subtasks for one scheduling run.
///
/// Ids are guaranteed unique and non-empty. Dependency ids are *not* checked
/// here: dangling references and cycles are tolerated and end up resolved as
/// unmet dependencies by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    id: String,
    subtasks: Vec<Subtask>,
}

impl TaskGraph {
    pub fn new(id: impl Into<String>, subtasks: Vec<Subtask>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for subtask in &subtasks {
            if subtask.id.trim().is_empty() {
                return Err(SwarmError::ConfigError(
                    "subtask ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(subtask.id.as_str()) {
                return Err(SwarmError::DuplicateSubtask(subtask.id.clone()));
            }
        }

        Ok(Self {
            id: id.into(),
            subtasks,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subtasks in declaration order.
    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn get(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Subtasks with no declared dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &Subtask> {
        self.subtasks.iter().filter(|s| s.dependencies.is_empty())
    }
}
