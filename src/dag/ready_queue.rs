// src/dag/ready_queue.rs

use std::collections::BTreeSet;

use tracing::debug;

/// Queue of subtasks whose dependencies have all succeeded but which have
/// not been dispatched yet.
///
/// Semantics:
/// - Entries are declaration indices, so draining always yields subtasks in
///   graph declaration order regardless of the order in which they became
///   ready. This is the dispatch tie-break when the concurrency bound is
///   smaller than the ready frontier.
/// - Each index is held at most once.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: BTreeSet<usize>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly ready subtask. Returns `false` if it was already queued.
    pub fn push(&mut self, idx: usize) -> bool {
        let inserted = self.entries.insert(idx);
        if !inserted {
            debug!(idx, "subtask already in ready queue; ignoring duplicate");
        }
        inserted
    }

    /// Remove and return up to `limit` entries in declaration order.
    pub fn take(&mut self, limit: usize) -> Vec<usize> {
        let mut taken = Vec::with_capacity(limit.min(self.entries.len()));
        while taken.len() < limit {
            match self.entries.pop_first() {
                Some(idx) => taken.push(idx),
                None => break,
            }
        }
        taken
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.entries.contains(&idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
