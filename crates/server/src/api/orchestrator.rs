use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::Value;

use levelapp_core::ErrorCode;

use crate::state::AppState;

/// Request body for workflow preparation.
#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    #[serde(default)]
    pub seed: Value,
}

/// `POST /orchestrator/{project_id}/{workflow_type}/prepare`
///
/// Returns 429 only for rate-limit rejections. Other verification failures
/// come back as 200 with `success: false` -- a refused launch is a normal
/// outcome, not a protocol error.
pub async fn prepare(
    State(state): State<AppState>,
    Path((project_id, workflow_type)): Path<(String, String)>,
    Json(request): Json<PrepareRequest>,
) -> impl IntoResponse {
    let response = state
        .orchestrator
        .prepare_workflow(&project_id, &workflow_type, &request.seed)
        .await;

    let status = if response.has_code(ErrorCode::RateLimited) {
        StatusCode::TOO_MANY_REQUESTS
    } else {
        StatusCode::OK
    };
    (status, Json(response))
}
