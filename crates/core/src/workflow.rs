use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The kinds of workflow the orchestrator can prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Generation,
    Rag,
    Extraction,
}

impl WorkflowType {
    /// Stable lowercase name used in URLs and token claims.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Rag => "rag",
            Self::Extraction => "extraction",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generation" => Ok(Self::Generation),
            "rag" => Ok(Self::Rag),
            "extraction" => Ok(Self::Extraction),
            other => Err(format!("unknown workflow type: {other}")),
        }
    }
}

/// Lifecycle state of a prepared workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Consumed,
    Expired,
}

/// A prepared workflow run, minted by the orchestrator and consumed by the
/// launched job.
///
/// Sessions are looked up by `(project_id, workflow_type, seed_hash)` for
/// idempotent preparation and evicted once `expires_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub session_id: Uuid,
    pub project_id: String,
    pub workflow_type: WorkflowType,
    /// First 16 hex chars of SHA-256 over the canonical seed encoding.
    pub seed_hash: String,
    /// Workflow-specific context assembled at init time (no heavy resources).
    pub context: Map<String, Value>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// Whether the session has passed its expiry instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Machine-readable failure categories surfaced by verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigMissing,
    ResourceUnavailable,
    ConnectivityError,
    PermissionDenied,
    ValidationError,
    RateLimited,
    SystemError,
}

/// Outcome of a single prerequisite check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Fail,
    Warn,
}

/// One named prerequisite check and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    /// A passing check.
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
            detail: None,
        }
    }

    /// A failing check with a diagnostic detail.
    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregate verification outcome: all checks run, all failures accumulated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub ready: bool,
    pub checks: Vec<CheckResult>,
    pub reasons: Vec<String>,
    pub codes: Vec<ErrorCode>,
}

impl VerificationResult {
    /// A single-check denial, used for gate failures (authorization, unknown
    /// workflow type, rate limiting, system faults).
    pub fn denied(
        check: CheckResult,
        reason: impl Into<String>,
        code: ErrorCode,
    ) -> Self {
        Self {
            ready: false,
            checks: vec![check],
            reasons: vec![reason.into()],
            codes: vec![code],
        }
    }

    /// Whether a specific code was recorded.
    #[must_use]
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.codes.contains(&code)
    }
}

/// Response of the orchestrator's single top-level operation.
///
/// Orchestrator failures are materialized here, never raised: a caller
/// inspects `success`, `verification.codes`, and `verification.reasons`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
}

impl LaunchResponse {
    /// A granted launch.
    #[must_use]
    pub fn granted(session_id: Uuid, launch_token: String, redirect_path: String) -> Self {
        Self {
            success: true,
            session_id: Some(session_id),
            launch_token: Some(launch_token),
            redirect_path: Some(redirect_path),
            verification: None,
        }
    }

    /// A refused launch carrying the verification outcome.
    #[must_use]
    pub fn refused(verification: VerificationResult) -> Self {
        Self {
            success: false,
            session_id: None,
            launch_token: None,
            redirect_path: None,
            verification: Some(verification),
        }
    }

    /// Whether the refusal carries the given code.
    #[must_use]
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.verification
            .as_ref()
            .is_some_and(|v| v.has_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_type_parses_lowercase() {
        assert_eq!("generation".parse::<WorkflowType>().unwrap(), WorkflowType::Generation);
        assert_eq!("rag".parse::<WorkflowType>().unwrap(), WorkflowType::Rag);
        assert!("quantum".parse::<WorkflowType>().is_err());
    }

    #[test]
    fn error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::RateLimited).unwrap();
        assert_eq!(json, "\"RATE_LIMITED\"");
        let json = serde_json::to_string(&ErrorCode::ConnectivityError).unwrap();
        assert_eq!(json, "\"CONNECTIVITY_ERROR\"");
    }

    #[test]
    fn session_expiry_boundary() {
        let now = Utc::now();
        let session = WorkflowSession {
            session_id: Uuid::new_v4(),
            project_id: "p".to_owned(),
            workflow_type: WorkflowType::Generation,
            seed_hash: "0123456789abcdef".to_owned(),
            context: Map::new(),
            status: SessionStatus::Ready,
            created_at: now,
            expires_at: now,
        };
        // expires_at <= now counts as expired.
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn refused_response_exposes_codes() {
        let response = LaunchResponse::refused(VerificationResult::denied(
            CheckResult::fail("rate_limit", "Too many requests"),
            "Rate limit exceeded",
            ErrorCode::RateLimited,
        ));
        assert!(!response.success);
        assert!(response.has_code(ErrorCode::RateLimited));
        assert!(!response.has_code(ErrorCode::SystemError));
    }

    #[test]
    fn granted_response_omits_verification_in_json() {
        let response =
            LaunchResponse::granted(Uuid::new_v4(), "token".to_owned(), "/path".to_owned());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("verification").is_none());
    }
}
