//! End-to-end tests of the verify → init → launch state machine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use levelapp_core::{ErrorCode, VerificationResult, WorkflowType};
use levelapp_orchestrator::{Orchestrator, OrchestratorBuilder, Verifier};
use levelapp_state::SessionStore;
use levelapp_state_memory::MemorySessionStore;

/// Verifier that approves everything; isolates the state machine from probes.
struct AlwaysReady;

#[async_trait]
impl Verifier for AlwaysReady {
    async fn verify(&self, _: &str, _: WorkflowType, _: &Value) -> VerificationResult {
        VerificationResult {
            ready: true,
            checks: vec![],
            reasons: vec![],
            codes: vec![],
        }
    }
}

/// Verifier that denies everything with `PERMISSION_DENIED`.
struct AlwaysDenied;

#[async_trait]
impl Verifier for AlwaysDenied {
    async fn verify(&self, _: &str, _: WorkflowType, _: &Value) -> VerificationResult {
        VerificationResult {
            ready: false,
            checks: vec![],
            reasons: vec!["denied".to_owned()],
            codes: vec![ErrorCode::PermissionDenied],
        }
    }
}

fn orchestrator(store: Arc<MemorySessionStore>) -> Orchestrator {
    OrchestratorBuilder::new(store)
        .with_verifier(Arc::new(AlwaysReady))
        .with_jwt_secret("test-secret")
        .build()
}

mod idempotency {
    use super::*;

    #[tokio::test]
    async fn same_seed_reuses_session_with_fresh_token() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store.clone());
        let seed = json!({"endpoint": "http://x"});

        let first = orch.prepare_workflow("P", "generation", &seed).await;
        let second = orch.prepare_workflow("P", "generation", &seed).await;

        assert!(first.success && second.success);
        assert_eq!(first.session_id, second.session_id);
        assert_ne!(first.launch_token, second.launch_token);

        // Both tokens decode to the same session.
        let claims_a = orch
            .verify_launch_token(first.launch_token.as_deref().unwrap())
            .unwrap();
        let claims_b = orch
            .verify_launch_token(second.launch_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(claims_a.session_id, claims_b.session_id);
        assert_eq!(claims_a.session_id, first.session_id.unwrap());

        // Exactly one session was minted.
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn key_order_in_seed_does_not_matter() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store);

        let a = orch
            .prepare_workflow("P", "generation", &json!({"a": 1, "b": 2}))
            .await;
        let b = orch
            .prepare_workflow("P", "generation", &json!({"b": 2, "a": 1}))
            .await;
        assert_eq!(a.session_id, b.session_id);
    }

    #[tokio::test]
    async fn reuse_does_not_mutate_the_session() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store.clone());
        let seed = json!({"endpoint": "http://x"});

        let first = orch.prepare_workflow("P", "generation", &seed).await;
        let session_id = first.session_id.unwrap();
        let before = store.get(session_id).await.unwrap().unwrap();

        orch.prepare_workflow("P", "generation", &seed).await;
        let after = store.get(session_id).await.unwrap().unwrap();

        assert_eq!(before.created_at, after.created_at);
        assert_eq!(before.expires_at, after.expires_at);
        assert_eq!(before.seed_hash, after.seed_hash);
        assert_eq!(before.context, after.context);
    }

    #[tokio::test]
    async fn different_workflow_types_get_different_sessions() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store);
        let seed = json!({"x": 1});

        let generation = orch.prepare_workflow("P", "generation", &seed).await;
        let rag = orch.prepare_workflow("P", "rag", &seed).await;
        assert_ne!(generation.session_id, rag.session_id);
    }
}

mod rate_limiting {
    use super::*;

    #[tokio::test]
    async fn eleventh_call_in_a_burst_is_rejected() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store);

        let mut rate_limited = 0;
        for k in 0..11 {
            let response = orch
                .prepare_workflow("P", "generation", &json!({"i": k}))
                .await;
            if response.has_code(ErrorCode::RateLimited) {
                assert!(!response.success);
                rate_limited += 1;
            } else {
                assert!(response.success);
            }
        }
        assert_eq!(rate_limited, 1, "exactly the 11th call is rejected");
    }

    #[tokio::test]
    async fn other_projects_are_unaffected() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store);

        for k in 0..10 {
            orch.prepare_workflow("A", "generation", &json!({"i": k}))
                .await;
        }
        let blocked = orch.prepare_workflow("A", "generation", &json!({})).await;
        assert!(blocked.has_code(ErrorCode::RateLimited));

        let fine = orch.prepare_workflow("B", "generation", &json!({})).await;
        assert!(fine.success);
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn unknown_workflow_type_is_refused_but_counted() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = OrchestratorBuilder::new(store.clone())
            .with_verifier(Arc::new(AlwaysReady))
            .with_rate_limit_per_min(2)
            .with_jwt_secret("test-secret")
            .build();

        let response = orch.prepare_workflow("P", "quantum", &json!({})).await;
        assert!(!response.success);
        assert!(response.has_code(ErrorCode::ValidationError));
        assert!(response.session_id.is_none(), "no session is minted");
        assert!(store.is_empty());

        // The malformed call still consumed rate-limit budget.
        orch.prepare_workflow("P", "quantum", &json!({})).await;
        let third = orch.prepare_workflow("P", "generation", &json!({})).await;
        assert!(third.has_code(ErrorCode::RateLimited));
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn verifier_denial_is_materialized_not_raised() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = OrchestratorBuilder::new(store.clone())
            .with_verifier(Arc::new(AlwaysDenied))
            .with_jwt_secret("test-secret")
            .build();

        let response = orch.prepare_workflow("P", "generation", &json!({})).await;
        assert!(!response.success);
        assert!(response.has_code(ErrorCode::PermissionDenied));
        assert!(store.is_empty(), "denied workflows mint no session");
    }

    #[tokio::test]
    async fn failed_verification_does_not_poison_idempotency() {
        // A denial leaves no session behind, so a later prepare with the
        // same seed goes through the full verify path again.
        let store = Arc::new(MemorySessionStore::new());
        let denied = OrchestratorBuilder::new(store.clone())
            .with_verifier(Arc::new(AlwaysDenied))
            .with_jwt_secret("test-secret")
            .build();
        denied.prepare_workflow("P", "generation", &json!({})).await;

        let allowed = orchestrator(store);
        let response = allowed.prepare_workflow("P", "generation", &json!({})).await;
        assert!(response.success);
    }
}

mod launch_tokens {
    use super::*;

    #[tokio::test]
    async fn token_claims_match_the_prepared_workflow() {
        let store = Arc::new(MemorySessionStore::new());
        let orch = orchestrator(store);

        let response = orch
            .prepare_workflow("proj-42", "rag", &json!({"source_url": null}))
            .await;
        let claims = orch
            .verify_launch_token(response.launch_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(claims.project_id, "proj-42");
        assert_eq!(claims.workflow_type, WorkflowType::Rag);
        assert_eq!(claims.exp - claims.nbf, 300);

        let redirect = response.redirect_path.unwrap();
        assert!(redirect.starts_with("/dashboard/projects/proj-42/rag-workflow?session_id="));
    }
}
