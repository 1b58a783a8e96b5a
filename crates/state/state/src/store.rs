use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use levelapp_core::{WorkflowSession, WorkflowType};

use crate::error::StateError;

/// Trait for persisting prepared workflow sessions.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Expired sessions must never be returned by `get` or `find_by`, whether or
/// not `delete_expired` has run — callers may deploy without a background
/// sweeper.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session, overwriting any previous session with the same id.
    async fn put(&self, session: WorkflowSession) -> Result<(), StateError>;

    /// Fetch a session by id. Returns `None` if absent or expired.
    async fn get(&self, session_id: Uuid) -> Result<Option<WorkflowSession>, StateError>;

    /// Find a live session by its idempotency key.
    ///
    /// Returns the non-expired session matching `(project_id, workflow_type,
    /// seed_hash)`, or `None`. This backs idempotent workflow preparation.
    async fn find_by(
        &self,
        project_id: &str,
        workflow_type: WorkflowType,
        seed_hash: &str,
    ) -> Result<Option<WorkflowSession>, StateError>;

    /// Evict every session with `expires_at <= now`. Returns the number of
    /// sessions removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, StateError>;
}
