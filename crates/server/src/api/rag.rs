use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use levelapp_rag::{
    ChunkSelectionRequest, ExpectedAnswerResponse, RagEvaluationRequest, RagEvaluationResult,
    RagInitRequest, RagInitResponse,
};

use crate::error::ServerError;
use crate::state::AppState;

/// `POST /v1/rag/init` -- warm the chatbot and scrape the source page.
pub async fn init(
    State(state): State<AppState>,
    Json(request): Json<RagInitRequest>,
) -> Result<Json<RagInitResponse>, ServerError> {
    Ok(Json(state.rag.initialize(request).await?))
}

/// `POST /v1/rag/expected` -- generate the golden answer from selected chunks.
pub async fn expected(
    State(state): State<AppState>,
    Json(request): Json<ChunkSelectionRequest>,
) -> Result<Json<ExpectedAnswerResponse>, ServerError> {
    Ok(Json(state.rag.generate_expected(request).await?))
}

/// `POST /v1/rag/evaluate` -- query the chatbot and score its answer.
pub async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<RagEvaluationRequest>,
) -> Result<Json<RagEvaluationResult>, ServerError> {
    Ok(Json(state.rag.evaluate(request).await?))
}

/// `DELETE /v1/rag/sessions/{session_id}` -- drop a pipeline session.
pub async fn cleanup(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    if state.rag.cleanup_session(session_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
