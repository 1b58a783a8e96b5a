use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use levelapp_core::{CheckResult, ErrorCode, VerificationResult, WorkflowType};

/// Hard wall-clock budget for each external verifier probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Decides whether the caller may prepare workflows for a project.
pub type ProjectAuthorizer = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Workflow-type-dispatched prerequisite prober.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Run every prerequisite check for the workflow, accumulating failures
    /// rather than stopping at the first one. Only the authorization gate
    /// short-circuits.
    async fn verify(
        &self,
        project_id: &str,
        workflow_type: WorkflowType,
        seed: &Value,
    ) -> VerificationResult;
}

/// Default verifier: authorization gate, provider config presence, and
/// endpoint reachability probes under the 2-second budget.
pub struct PrerequisiteVerifier {
    client: reqwest::Client,
    configured_providers: Vec<String>,
    rag_available: bool,
    authorizer: Option<ProjectAuthorizer>,
}

impl PrerequisiteVerifier {
    /// Create a verifier knowing which judge providers are configured.
    pub fn new(configured_providers: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            configured_providers,
            rag_available: true,
            authorizer: None,
        }
    }

    /// Mark the RAG subsystem unavailable (dependencies not deployed).
    #[must_use]
    pub fn with_rag_available(mut self, available: bool) -> Self {
        self.rag_available = available;
        self
    }

    /// Install a project authorization callback. Without one, every project
    /// is authorized.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: ProjectAuthorizer) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    fn project_authorized(&self, project_id: &str) -> bool {
        self.authorizer.as_ref().is_none_or(|auth| auth(project_id))
    }

    /// HEAD-probe a URL under both the client timeout and the wall-clock
    /// budget, so a stalled connection cannot blow past two seconds.
    async fn probe(&self, url: &str) -> Result<u16, String> {
        let request = self.client.head(url).send();
        match tokio::time::timeout(PROBE_TIMEOUT, request).await {
            Ok(Ok(response)) => Ok(response.status().as_u16()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("probe exceeded {}s budget", PROBE_TIMEOUT.as_secs())),
        }
    }

    async fn verify_generation(&self, seed: &Value) -> VerificationResult {
        let mut checks = Vec::new();
        let mut codes = Vec::new();
        let mut reasons = Vec::new();

        if self.configured_providers.is_empty() {
            checks.push(CheckResult::fail("api_key", "Missing provider API keys"));
            codes.push(ErrorCode::ConfigMissing);
            reasons.push("API keys not configured".to_owned());
        } else {
            checks.push(CheckResult::ok("api_key"));
        }

        if let Some(endpoint) = seed.get("endpoint").and_then(Value::as_str) {
            match self.probe(endpoint).await {
                Ok(status) if status < 400 => checks.push(CheckResult::ok("endpoint")),
                Ok(status) => {
                    checks.push(CheckResult::fail("endpoint", format!("HTTP {status}")));
                    codes.push(ErrorCode::ConnectivityError);
                    reasons.push("Endpoint health check failed".to_owned());
                }
                Err(detail) => {
                    checks.push(CheckResult::fail("endpoint", detail));
                    codes.push(ErrorCode::ConnectivityError);
                    reasons.push("Cannot reach endpoint".to_owned());
                }
            }
        }

        VerificationResult {
            ready: codes.is_empty(),
            checks,
            reasons,
            codes,
        }
    }

    async fn verify_rag(&self, seed: &Value) -> VerificationResult {
        let mut checks = Vec::new();
        let mut codes = Vec::new();
        let mut reasons = Vec::new();

        if let Some(source_url) = seed.get("source_url").and_then(Value::as_str) {
            match self.probe(source_url).await {
                Ok(200) => checks.push(CheckResult::ok("source_url")),
                Ok(status) => {
                    checks.push(CheckResult::fail(
                        "source_url",
                        format!("URL not accessible (HTTP {status})"),
                    ));
                    codes.push(ErrorCode::ResourceUnavailable);
                    reasons.push("Source URL not accessible".to_owned());
                }
                Err(detail) => {
                    checks.push(CheckResult::fail("source_url", detail));
                    codes.push(ErrorCode::ConnectivityError);
                    reasons.push("Cannot reach source URL".to_owned());
                }
            }
        }

        if self.rag_available {
            checks.push(CheckResult::ok("rag_service"));
        } else {
            checks.push(CheckResult::fail("rag_service", "RAG service unavailable"));
            codes.push(ErrorCode::ResourceUnavailable);
            reasons.push("RAG evaluation service not ready".to_owned());
        }

        VerificationResult {
            ready: codes.is_empty(),
            checks,
            reasons,
            codes,
        }
    }

    /// Extraction is a deliberate stub until the document workflow lands.
    fn verify_extraction() -> VerificationResult {
        VerificationResult::denied(
            CheckResult::fail("extraction", "Not implemented"),
            "Document extraction workflow not implemented",
            ErrorCode::ResourceUnavailable,
        )
    }
}

#[async_trait]
impl Verifier for PrerequisiteVerifier {
    async fn verify(
        &self,
        project_id: &str,
        workflow_type: WorkflowType,
        seed: &Value,
    ) -> VerificationResult {
        // Authorization gates everything; external probes never run for a
        // denied project.
        if !self.project_authorized(project_id) {
            return VerificationResult::denied(
                CheckResult::fail("authorization", "Access denied to project"),
                "User lacks access to project",
                ErrorCode::PermissionDenied,
            );
        }

        debug!(project_id, %workflow_type, "running prerequisite checks");
        match workflow_type {
            WorkflowType::Generation => self.verify_generation(seed).await,
            WorkflowType::Rag => self.verify_rag(seed).await,
            WorkflowType::Extraction => Self::verify_extraction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verifier() -> PrerequisiteVerifier {
        PrerequisiteVerifier::new(vec!["openai".to_owned()])
    }

    #[tokio::test]
    async fn generation_without_endpoint_is_ready() {
        let result = verifier()
            .verify("p", WorkflowType::Generation, &json!({}))
            .await;
        assert!(result.ready);
        assert_eq!(result.checks.len(), 1);
    }

    #[tokio::test]
    async fn generation_without_providers_fails_config() {
        let result = PrerequisiteVerifier::new(Vec::new())
            .verify("p", WorkflowType::Generation, &json!({}))
            .await;
        assert!(!result.ready);
        assert!(result.has_code(ErrorCode::ConfigMissing));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connectivity_error() {
        let result = verifier()
            .verify(
                "p",
                WorkflowType::Generation,
                &json!({"endpoint": "http://127.0.0.1:9/health"}),
            )
            .await;
        assert!(!result.ready);
        assert!(result.has_code(ErrorCode::ConnectivityError));
        // The api_key check still ran and passed: failures accumulate.
        assert!(result.checks.iter().any(|c| c.name == "api_key"));
    }

    #[tokio::test]
    async fn denied_project_short_circuits() {
        let result = verifier()
            .with_authorizer(Arc::new(|_| false))
            .verify(
                "p",
                WorkflowType::Generation,
                &json!({"endpoint": "http://127.0.0.1:9/health"}),
            )
            .await;
        assert!(!result.ready);
        assert!(result.has_code(ErrorCode::PermissionDenied));
        // No other checks ran.
        assert_eq!(result.checks.len(), 1);
    }

    #[tokio::test]
    async fn extraction_is_a_conscious_stub() {
        let result = verifier()
            .verify("p", WorkflowType::Extraction, &json!({}))
            .await;
        assert!(!result.ready);
        assert!(result.has_code(ErrorCode::ResourceUnavailable));
    }

    #[tokio::test]
    async fn rag_unavailable_is_reported() {
        let result = verifier()
            .with_rag_available(false)
            .verify("p", WorkflowType::Rag, &json!({}))
            .await;
        assert!(!result.ready);
        assert!(result.has_code(ErrorCode::ResourceUnavailable));
    }
}
