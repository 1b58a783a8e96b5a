use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use levelapp_core::{WorkflowSession, WorkflowType};
use levelapp_state::{SessionStore, StateError};

/// Thread-safe in-memory session store backed by a `DashMap`.
///
/// Expiry is enforced lazily on every read, so correctness does not depend
/// on the background sweeper having run.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, WorkflowSession>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held, including not-yet-evicted expired
    /// ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: WorkflowSession) -> Result<(), StateError> {
        self.sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<WorkflowSession>, StateError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get(&session_id)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.clone()))
    }

    async fn find_by(
        &self,
        project_id: &str,
        workflow_type: WorkflowType,
        seed_hash: &str,
    ) -> Result<Option<WorkflowSession>, StateError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .iter()
            .find(|entry| {
                entry.project_id == project_id
                    && entry.workflow_type == workflow_type
                    && entry.seed_hash == seed_hash
                    && !entry.is_expired(now)
            })
            .map(|entry| entry.clone()))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, StateError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
