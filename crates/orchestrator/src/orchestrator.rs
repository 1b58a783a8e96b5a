use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use levelapp_core::{
    CheckResult, ErrorCode, LaunchResponse, SessionStatus, VerificationResult, WorkflowSession,
    WorkflowType, seed_hash,
};
use levelapp_state::SessionStore;

use crate::ratelimit::RateLimiter;
use crate::token::LaunchTokenIssuer;
use crate::verifier::{PrerequisiteVerifier, Verifier};

/// Default prepare-call cap per project per rolling minute
/// (`ORCH_RATE_LIMIT_PER_MIN`).
pub const DEFAULT_RATE_LIMIT_PER_MIN: usize = 10;

/// Default session TTL in minutes (`ORCH_SESSION_TTL_MIN`).
pub const DEFAULT_SESSION_TTL_MIN: i64 = 15;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

/// Models advertised to freshly initialized generation workflows.
const AVAILABLE_MODELS: &[&str] = &[
    "meta-llama/Llama-3.3-70B-Instruct",
    "meta-llama/Meta-Llama-3.1-8B-Instruct",
];

/// Gates workflow preparation behind rate limiting, idempotency,
/// verification, and signed launch tokens.
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn Verifier>,
    rate_limiter: RateLimiter,
    token_issuer: LaunchTokenIssuer,
    session_ttl: Duration,
}

/// Builder wiring the orchestrator's collaborators. Rate-limit state and
/// session state are injected at construction, never global.
pub struct OrchestratorBuilder {
    store: Arc<dyn SessionStore>,
    verifier: Option<Arc<dyn Verifier>>,
    rate_limit_per_min: usize,
    session_ttl_minutes: i64,
    jwt_secret: Option<String>,
}

impl OrchestratorBuilder {
    /// Start building an orchestrator around a session store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            verifier: None,
            rate_limit_per_min: DEFAULT_RATE_LIMIT_PER_MIN,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MIN,
            jwt_secret: None,
        }
    }

    /// Replace the default prerequisite verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the per-project prepare-call cap per rolling minute.
    #[must_use]
    pub fn with_rate_limit_per_min(mut self, limit: usize) -> Self {
        self.rate_limit_per_min = limit;
        self
    }

    /// Set the session TTL in minutes.
    #[must_use]
    pub fn with_session_ttl_minutes(mut self, minutes: i64) -> Self {
        self.session_ttl_minutes = minutes;
        self
    }

    /// Set the launch-token signing secret.
    #[must_use]
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Read tunables from the environment (`ORCH_RATE_LIMIT_PER_MIN`,
    /// `ORCH_SESSION_TTL_MIN`, `ORCHESTRATOR_JWT_SECRET`), keeping any
    /// values already set explicitly.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Ok(raw) = std::env::var("ORCH_RATE_LIMIT_PER_MIN")
            && let Ok(limit) = raw.parse()
        {
            self.rate_limit_per_min = limit;
        }
        if let Ok(raw) = std::env::var("ORCH_SESSION_TTL_MIN")
            && let Ok(minutes) = raw.parse()
        {
            self.session_ttl_minutes = minutes;
        }
        if self.jwt_secret.is_none()
            && let Ok(secret) = std::env::var("ORCHESTRATOR_JWT_SECRET")
        {
            self.jwt_secret = Some(secret);
        }
        self
    }

    /// Finish the build.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let secret = self.jwt_secret.unwrap_or_else(|| {
            warn!("ORCHESTRATOR_JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_owned()
        });
        let verifier = self
            .verifier
            .unwrap_or_else(|| Arc::new(PrerequisiteVerifier::new(Vec::new())));
        Orchestrator {
            store: self.store,
            verifier,
            rate_limiter: RateLimiter::new(self.rate_limit_per_min),
            token_issuer: LaunchTokenIssuer::new(&secret),
            session_ttl: Duration::minutes(self.session_ttl_minutes),
        }
    }
}

impl Orchestrator {
    /// The single top-level operation: verify → init → launch.
    ///
    /// Never errors across this boundary. Every failure mode is materialized
    /// into the [`LaunchResponse`].
    pub async fn prepare_workflow(
        &self,
        project_id: &str,
        workflow_type: &str,
        seed: &Value,
    ) -> LaunchResponse {
        info!(project_id, workflow_type, "orchestrator prepare started");

        // Rate limit first: even malformed requests consume budget.
        if let Err(exceeded) = self.rate_limiter.check(project_id).await {
            warn!(
                project_id,
                retry_after = exceeded.retry_after,
                "prepare call rate limited"
            );
            return LaunchResponse::refused(VerificationResult::denied(
                CheckResult::fail("rate_limit", "Too many requests"),
                "Rate limit exceeded",
                ErrorCode::RateLimited,
            ));
        }

        let Ok(workflow_type) = WorkflowType::from_str(workflow_type) else {
            return LaunchResponse::refused(VerificationResult::denied(
                CheckResult::fail("workflow_type", "Unknown workflow"),
                "Unknown workflow type",
                ErrorCode::ValidationError,
            ));
        };

        // Idempotency: an equal seed within the session TTL reuses the
        // session and only re-issues the short-lived token.
        let seed_hash = seed_hash(seed);
        match self
            .store
            .find_by(project_id, workflow_type, &seed_hash)
            .await
        {
            Ok(Some(existing)) => {
                info!(
                    project_id,
                    session_id = %existing.session_id,
                    "reusing existing session (idempotent prepare)"
                );
                return self.grant(&existing);
            }
            Ok(None) => {}
            Err(err) => {
                error!(project_id, error = %err, "session store lookup failed");
                return system_failure(err.to_string());
            }
        }

        let verification = self.verifier.verify(project_id, workflow_type, seed).await;
        info!(
            project_id,
            %workflow_type,
            ready = verification.ready,
            codes = ?verification.codes,
            "verification finished"
        );
        if !verification.ready {
            return LaunchResponse::refused(verification);
        }

        // Init is light on purpose: context assembly only, no network I/O.
        // Heavy resource allocation belongs to the launched job.
        let session = self.mint_session(project_id, workflow_type, seed, seed_hash);
        if let Err(err) = self.store.put(session.clone()).await {
            error!(project_id, error = %err, "failed to store session");
            return system_failure(err.to_string());
        }
        info!(project_id, session_id = %session.session_id, "session initialized");

        self.grant(&session)
    }

    /// Issue a fresh launch token and redirect path for a session.
    fn grant(&self, session: &WorkflowSession) -> LaunchResponse {
        match self.token_issuer.issue(
            session.session_id,
            &session.project_id,
            session.workflow_type,
        ) {
            Ok(token) => {
                let redirect =
                    redirect_path(session.workflow_type, &session.project_id, session.session_id);
                info!(session_id = %session.session_id, "launch granted");
                LaunchResponse::granted(session.session_id, token, redirect)
            }
            Err(err) => {
                error!(session_id = %session.session_id, error = %err, "token issuance failed");
                system_failure(err.to_string())
            }
        }
    }

    fn mint_session(
        &self,
        project_id: &str,
        workflow_type: WorkflowType,
        seed: &Value,
        seed_hash: String,
    ) -> WorkflowSession {
        let now = Utc::now();
        WorkflowSession {
            session_id: Uuid::new_v4(),
            project_id: project_id.to_owned(),
            workflow_type,
            seed_hash,
            context: build_context(workflow_type, seed),
            status: SessionStatus::Ready,
            created_at: now,
            expires_at: now + self.session_ttl,
        }
    }

    /// Verify a previously issued launch token.
    pub fn verify_launch_token(
        &self,
        token: &str,
    ) -> Result<crate::token::LaunchClaims, crate::token::TokenError> {
        self.token_issuer.verify(token)
    }
}

/// Assemble the workflow-specific context from the seed. Pure: no I/O, no
/// heavy resources.
fn build_context(workflow_type: WorkflowType, seed: &Value) -> Map<String, Value> {
    let mut context = Map::new();
    match workflow_type {
        WorkflowType::Generation => {
            context.insert(
                "endpoint_url".to_owned(),
                seed.get("endpoint").cloned().unwrap_or(Value::Null),
            );
            context.insert("available_models".to_owned(), json!(AVAILABLE_MODELS));
        }
        WorkflowType::Rag => {
            context.insert(
                "source_url".to_owned(),
                seed.get("source_url").cloned().unwrap_or(Value::Null),
            );
            context.insert(
                "chunk_size".to_owned(),
                seed.get("chunk_size").cloned().unwrap_or(json!(512)),
            );
        }
        WorkflowType::Extraction => {
            context.insert(
                "document_ids".to_owned(),
                seed.get("document_ids").cloned().unwrap_or(json!([])),
            );
            context.insert(
                "schema_id".to_owned(),
                seed.get("schema_id").cloned().unwrap_or(Value::Null),
            );
        }
    }
    context
}

/// Workflow-type-indexed redirect target with the session interpolated.
fn redirect_path(workflow_type: WorkflowType, project_id: &str, session_id: Uuid) -> String {
    match workflow_type {
        WorkflowType::Generation => {
            format!("/dashboard/projects/{project_id}/evaluate?session_id={session_id}")
        }
        WorkflowType::Rag => {
            format!("/dashboard/projects/{project_id}/rag-workflow?session_id={session_id}")
        }
        WorkflowType::Extraction => {
            format!("/dashboard/projects/{project_id}/extraction-workflow?session_id={session_id}")
        }
    }
}

fn system_failure(detail: String) -> LaunchResponse {
    LaunchResponse::refused(VerificationResult::denied(
        CheckResult::fail("system", detail.clone()),
        format!("System error: {detail}"),
        ErrorCode::SystemError,
    ))
}
