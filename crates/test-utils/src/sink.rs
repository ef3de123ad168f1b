use std::sync::Mutex;

use taskswarm::engine::{ProgressEvent, ProgressSink};

/// `ProgressSink` that keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Subtask ids in dispatch order.
    pub fn dispatched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Dispatched { subtask, .. } => Some(subtask),
                _ => None,
            })
            .collect()
    }

    pub fn cancel_requests(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::CancelRequested { subtask } => Some(subtask),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn notify(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
