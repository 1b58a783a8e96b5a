use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use levelapp_evaluators::EvaluationService;
use levelapp_orchestrator::{OrchestratorBuilder, PrerequisiteVerifier, spawn_sweeper};
use levelapp_rag::{GenerationConfig, GenerationService, RagPipeline};
use levelapp_server::{AppState, LevelappConfig, build_router, configure_evaluation_service};
use levelapp_server::config::expand_env_vars;
use levelapp_state_memory::MemorySessionStore;

#[derive(Debug, Parser)]
#[command(name = "levelapp-server", about = "LevelApp evaluation harness server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "levelapp.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = LevelappConfig::load(&args.config)?;

    let evaluation_service =
        Arc::new(EvaluationService::new().map_err(|e| format!("evaluation service: {e}"))?);
    configure_evaluation_service(&config, &evaluation_service);

    let generation_service = Arc::new(GenerationService::new());
    if let Some(openai) = config.providers.get("openai") {
        let mut generation = GenerationConfig::new();
        if let Some(api_url) = &openai.api_url {
            generation = generation.with_api_url(expand_env_vars(api_url));
        }
        if let Some(api_key) = &openai.api_key {
            generation = generation.with_api_key(expand_env_vars(api_key));
        }
        if let Some(model_id) = &openai.model_id {
            generation = generation.with_model_id(expand_env_vars(model_id));
        }
        generation_service.set_config("openai", generation);
    }

    let store = Arc::new(MemorySessionStore::new());
    let verifier = PrerequisiteVerifier::new(evaluation_service.configured_providers());
    let orchestrator = Arc::new(
        OrchestratorBuilder::new(store.clone())
            .with_verifier(Arc::new(verifier))
            .from_env()
            .build(),
    );
    let (_sweeper, _sweeper_shutdown) = spawn_sweeper(store);

    let rag = Arc::new(RagPipeline::new(
        Arc::clone(&evaluation_service),
        generation_service,
        config.rag.chatbot_base_url.clone(),
        config.rag.chatbot_chat_path.clone(),
    ));

    let state = AppState::new(orchestrator, evaluation_service, rag);
    let router = build_router(state);

    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| format!("failed to bind {bind}: {e}"))?;
    info!(%bind, "levelapp server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
