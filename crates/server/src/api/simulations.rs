use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use levelapp_core::{BatchResult, ConversationBatch};
use levelapp_simulator::{ConversationSimulator, EndpointDescriptor};

use crate::error::ServerError;
use crate::state::AppState;

fn default_attempts() -> u32 {
    1
}

/// Endpoint descriptor as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct EndpointRequest {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub payload_template: Option<Value>,
}

/// Request body for a batch simulation run.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub name: String,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    pub batch: ConversationBatch,
    pub endpoint: EndpointRequest,
    /// Restrict judging to these providers; defaults to all configured.
    #[serde(default)]
    pub providers: Option<Vec<String>>,
}

/// `POST /v1/simulations/run` -- drive one batch and return the envelope.
pub async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<BatchResult>, ServerError> {
    let mut endpoint = EndpointDescriptor::new(request.endpoint.url);
    for (name, value) in request.endpoint.headers {
        endpoint = endpoint.with_header(name, value);
    }
    if let Some(template) = request.endpoint.payload_template {
        endpoint = endpoint.with_payload_template(template);
    }

    let mut simulator = ConversationSimulator::new(
        request.batch,
        Arc::clone(&state.evaluation_service),
        endpoint,
    );
    if let Some(providers) = request.providers {
        simulator = simulator.with_providers(providers);
    }

    Ok(Json(simulator.run_batch(&request.name, request.attempts).await))
}
