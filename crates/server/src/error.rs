use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use levelapp_rag::RagError;

/// JSON error body returned on failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RagError> for ServerError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::SessionNotFound(id) => Self::NotFound(format!("session {id}")),
            RagError::InitFailed(detail) | RagError::ChatbotUnavailable(detail) => {
                Self::Upstream(detail)
            }
            RagError::Scrape(detail) => Self::Upstream(detail),
            RagError::Generation(err) => Self::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_session_not_found_maps_to_404() {
        let err = ServerError::from(RagError::SessionNotFound(uuid::Uuid::new_v4()));
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn rag_upstream_failures_map_to_502() {
        let err = ServerError::from(RagError::InitFailed("HTTP 500".into()));
        assert!(matches!(err, ServerError::Upstream(_)));
    }
}
