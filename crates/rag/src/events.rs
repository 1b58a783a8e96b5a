use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

const DEFAULT_CAPACITY: usize = 1024;

/// One recorded pipeline event.
#[derive(Debug, Clone, Serialize)]
pub struct RagEvent {
    pub component: String,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded in-process event buffer for the RAG workflow.
///
/// Injected into the pipeline rather than shared process-wide, so two
/// pipelines never interleave their histories. Events are mirrored to
/// `tracing` for operators who only look at logs.
#[derive(Debug)]
pub struct RagEventLog {
    events: Mutex<Vec<RagEvent>>,
    capacity: usize,
}

impl Default for RagEventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RagEventLog {
    /// Create a log retaining at most `capacity` events (oldest dropped).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Record one event.
    pub fn record(&self, level: &str, message: impl Into<String>) {
        let message = message.into();
        info!(level, "[RAG] {message}");
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if events.len() == self.capacity {
            events.remove(0);
        }
        events.push(RagEvent {
            component: "rag_evaluation".to_owned(),
            level: level.to_owned(),
            message,
            timestamp: Utc::now(),
        });
    }

    /// Snapshot the retained events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RagEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
