//! HTTP surface for the LevelApp evaluation harness.
//!
//! Binds the orchestrator's prepare endpoint, the conversation simulator,
//! and the RAG pipeline behind an axum router. The binary in `main.rs` wires
//! configuration, stores, and background tasks around [`build_router`].

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::build_router;
pub use config::{LevelappConfig, configure_evaluation_service, expand_env_vars};
pub use error::ServerError;
pub use state::AppState;
