use chrono::{Duration, Utc};
use serde_json::Map;
use uuid::Uuid;

use levelapp_core::{SessionStatus, WorkflowSession, WorkflowType};

use crate::error::StateError;
use crate::store::SessionStore;

/// Build a session expiring `ttl_minutes` from now, for backend tests.
#[must_use]
pub fn session_fixture(
    project_id: &str,
    workflow_type: WorkflowType,
    seed_hash: &str,
    ttl_minutes: i64,
) -> WorkflowSession {
    let now = Utc::now();
    WorkflowSession {
        session_id: Uuid::new_v4(),
        project_id: project_id.to_owned(),
        workflow_type,
        seed_hash: seed_hash.to_owned(),
        context: Map::new(),
        status: SessionStatus::Ready,
        created_at: now,
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

/// Run the full session store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_session_store_conformance_tests(
    store: &dyn SessionStore,
) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_put_and_get(store).await?;
    test_find_by_idempotency_key(store).await?;
    test_find_by_ignores_expired(store).await?;
    test_get_ignores_expired(store).await?;
    test_delete_expired(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn SessionStore) -> Result<(), StateError> {
    let found = store.get(Uuid::new_v4()).await?;
    assert!(found.is_none(), "get on missing session should return None");
    Ok(())
}

async fn test_put_and_get(store: &dyn SessionStore) -> Result<(), StateError> {
    let session = session_fixture("proj-a", WorkflowType::Generation, "aaaa000011112222", 15);
    let id = session.session_id;
    store.put(session).await?;
    let found = store.get(id).await?;
    assert!(found.is_some(), "stored session should be retrievable");
    assert_eq!(found.unwrap().project_id, "proj-a");
    Ok(())
}

async fn test_find_by_idempotency_key(store: &dyn SessionStore) -> Result<(), StateError> {
    let session = session_fixture("proj-b", WorkflowType::Rag, "bbbb000011112222", 15);
    let id = session.session_id;
    store.put(session).await?;

    let hit = store
        .find_by("proj-b", WorkflowType::Rag, "bbbb000011112222")
        .await?;
    assert_eq!(
        hit.map(|s| s.session_id),
        Some(id),
        "find_by should return the matching session"
    );

    let miss = store
        .find_by("proj-b", WorkflowType::Generation, "bbbb000011112222")
        .await?;
    assert!(miss.is_none(), "workflow type must be part of the key");

    let miss = store
        .find_by("proj-b", WorkflowType::Rag, "ffff000011112222")
        .await?;
    assert!(miss.is_none(), "seed hash must be part of the key");
    Ok(())
}

async fn test_find_by_ignores_expired(store: &dyn SessionStore) -> Result<(), StateError> {
    let session = session_fixture("proj-c", WorkflowType::Generation, "cccc000011112222", -1);
    store.put(session).await?;
    let hit = store
        .find_by("proj-c", WorkflowType::Generation, "cccc000011112222")
        .await?;
    assert!(hit.is_none(), "expired session should not satisfy find_by");
    Ok(())
}

async fn test_get_ignores_expired(store: &dyn SessionStore) -> Result<(), StateError> {
    let session = session_fixture("proj-d", WorkflowType::Generation, "dddd000011112222", -1);
    let id = session.session_id;
    store.put(session).await?;
    let found = store.get(id).await?;
    assert!(found.is_none(), "expired session should not be returned");
    Ok(())
}

async fn test_delete_expired(store: &dyn SessionStore) -> Result<(), StateError> {
    let live = session_fixture("proj-e", WorkflowType::Generation, "eeee000011112222", 15);
    let live_id = live.session_id;
    let dead = session_fixture("proj-e", WorkflowType::Generation, "eeee333344445555", -5);
    store.put(live).await?;
    store.put(dead).await?;

    let evicted = store.delete_expired(Utc::now()).await?;
    assert!(evicted >= 1, "at least the expired session should be evicted");

    let found = store.get(live_id).await?;
    assert!(found.is_some(), "live session should survive eviction");
    Ok(())
}
