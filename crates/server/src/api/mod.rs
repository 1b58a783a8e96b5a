//! Route handlers and router assembly.

mod health;
mod orchestrator;
mod rag;
mod simulations;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/orchestrator/{project_id}/{workflow_type}/prepare",
            post(orchestrator::prepare),
        )
        .route("/v1/simulations/run", post(simulations::run))
        .route("/v1/rag/init", post(rag::init))
        .route("/v1/rag/expected", post(rag::expected))
        .route("/v1/rag/evaluate", post(rag::evaluate))
        .route("/v1/rag/sessions/{session_id}", delete(rag::cleanup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
