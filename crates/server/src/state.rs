use std::sync::Arc;

use levelapp_evaluators::EvaluationService;
use levelapp_orchestrator::Orchestrator;
use levelapp_rag::RagPipeline;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub evaluation_service: Arc<EvaluationService>,
    pub rag: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        evaluation_service: Arc<EvaluationService>,
        rag: Arc<RagPipeline>,
    ) -> Self {
        Self {
            orchestrator,
            evaluation_service,
            rag,
        }
    }
}
