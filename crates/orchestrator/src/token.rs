use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use levelapp_core::WorkflowType;

/// Audience claim carried by every launch token.
pub const LAUNCH_TOKEN_AUDIENCE: &str = "levelapp-orchestrator";

/// Launch tokens are valid for exactly five minutes from issuance.
pub const LAUNCH_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Errors from launch token issuance or verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims embedded in a launch token.
#[derive(Debug, Serialize, Deserialize)]
pub struct LaunchClaims {
    pub session_id: Uuid,
    pub project_id: String,
    pub workflow_type: WorkflowType,
    /// Unique token id. Re-issuing for the same session within the same
    /// second still yields a distinct token.
    pub jti: Uuid,
    /// Expiry (seconds since epoch).
    pub exp: usize,
    /// Not valid before (seconds since epoch).
    pub nbf: usize,
    pub aud: String,
}

/// Issues and verifies HS256-signed launch tokens.
///
/// The token is the authorization artifact the launched job presents back;
/// the orchestrator itself never starts the job. Tokens are deliberately
/// shorter-lived than sessions, so an idempotent re-prepare hands out a
/// fresh token for the same session.
pub struct LaunchTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl LaunchTokenIssuer {
    /// Create an issuer from the process signing secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token authorizing the launch of `session_id`.
    pub fn issue(
        &self,
        session_id: Uuid,
        project_id: &str,
        workflow_type: WorkflowType,
    ) -> Result<String, TokenError> {
        let now = usize::try_from(jsonwebtoken::get_current_timestamp())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let ttl = usize::try_from(LAUNCH_TOKEN_TTL.as_secs())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        let claims = LaunchClaims {
            session_id,
            project_id: project_id.to_owned(),
            workflow_type,
            jti: Uuid::new_v4(),
            exp: now + ttl,
            nbf: now,
            aud: LAUNCH_TOKEN_AUDIENCE.to_owned(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token's signature, expiry, not-before, and audience.
    pub fn verify(&self, token: &str) -> Result<LaunchClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[LAUNCH_TOKEN_AUDIENCE]);
        validation.validate_nbf = true;
        decode::<LaunchClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> LaunchTokenIssuer {
        LaunchTokenIssuer::new("test-secret")
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let session_id = Uuid::new_v4();
        let token = issuer()
            .issue(session_id, "proj-1", WorkflowType::Generation)
            .unwrap();
        let claims = issuer().verify(&token).unwrap();
        assert_eq!(claims.session_id, session_id);
        assert_eq!(claims.project_id, "proj-1");
        assert_eq!(claims.workflow_type, WorkflowType::Generation);
        assert_eq!(claims.aud, LAUNCH_TOKEN_AUDIENCE);
        assert_eq!(claims.exp - claims.nbf, 300);
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = issuer()
            .issue(Uuid::new_v4(), "p", WorkflowType::Rag)
            .unwrap();
        let other = LaunchTokenIssuer::new("different-secret");
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn distinct_issuances_yield_distinct_tokens_for_same_session() {
        let session_id = Uuid::new_v4();
        let token_a = issuer().issue(session_id, "p", WorkflowType::Rag).unwrap();
        let token_b = issuer().issue(session_id, "p", WorkflowType::Rag).unwrap();
        assert_ne!(token_a, token_b);
        assert_eq!(
            issuer().verify(&token_a).unwrap().session_id,
            issuer().verify(&token_b).unwrap().session_id,
        );
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            issuer().verify("not.a.token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
