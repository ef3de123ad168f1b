// src/engine/outcome.rs

//! Terminal per-subtask outcomes and the result set of a run.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::types::{Payload, SubtaskId};

/// Terminal status of a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Succeeded => f.write_str("succeeded"),
            OutcomeStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Why a subtask failed.
///
/// All of these are contained per subtask; none of them aborts a run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// No worker registered for the subtask's kind, or construction failed.
    #[error("worker_build_failure: {message}")]
    WorkerBuild { message: String },

    /// The worker returned an error (or panicked) while executing.
    #[error("{message}")]
    WorkerExecution { message: String },

    /// The subtask exceeded its deadline and was cancelled.
    #[error("timeout after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// A direct or transitive dependency failed or never ran.
    #[error("unmet_dependencies: [{}]", .unmet.join(", "))]
    UnmetDependencies { unmet: Vec<SubtaskId> },
}

/// Terminal record for one subtask.
///
/// `payload` is present only for successes and `reason` only for failures;
/// the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    subtask_id: SubtaskId,
    status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_reason")]
    reason: Option<FailureReason>,
}

impl Outcome {
    pub fn succeeded(subtask_id: impl Into<SubtaskId>, payload: Payload) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            status: OutcomeStatus::Succeeded,
            payload: Some(payload),
            reason: None,
        }
    }

    pub fn failed(subtask_id: impl Into<SubtaskId>, reason: FailureReason) -> Self {
        Self {
            subtask_id: subtask_id.into(),
            status: OutcomeStatus::Failed,
            payload: None,
            reason: Some(reason),
        }
    }

    pub fn subtask_id(&self) -> &str {
        &self.subtask_id
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        self.reason.as_ref()
    }
}

/// Serialize the reason as its structured form plus the human-readable text.
fn serialize_reason<S>(reason: &Option<FailureReason>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    #[derive(Serialize)]
    struct Repr<'a> {
        #[serde(flatten)]
        reason: &'a FailureReason,
        summary: String,
    }

    match reason {
        Some(reason) => Repr {
            reason,
            summary: reason.to_string(),
        }
        .serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Mapping from subtask id to exactly one [`Outcome`].
///
/// Outcomes are kept in the order they were recorded (completion order).
/// Completeness (one outcome per subtask of the graph) holds once the run
/// that produced the set has terminated.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    outcomes: HashMap<SubtaskId, Outcome>,
    order: Vec<SubtaskId>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. Returns `false` (and keeps the existing entry) if
    /// the subtask already has one.
    pub(crate) fn record(&mut self, outcome: Outcome) -> bool {
        if self.outcomes.contains_key(outcome.subtask_id()) {
            return false;
        }
        self.order.push(outcome.subtask_id.clone());
        self.outcomes.insert(outcome.subtask_id.clone(), outcome);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.outcomes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Subtask ids in the order their outcomes were recorded.
    pub fn completion_order(&self) -> &[SubtaskId] {
        &self.order
    }

    /// Outcomes in completion order.
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.order.iter().filter_map(|id| self.outcomes.get(id))
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Outcome> {
        self.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.values().all(Outcome::is_success)
    }
}

impl Serialize for ResultSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}
