//! Core data model for the LevelApp conversational-agent evaluation harness.
//!
//! This crate defines the entities shared by every subsystem: the
//! conversation batch fed to the simulator, the result envelope it produces,
//! the workflow session and verification types used by the orchestrator, and
//! the seed-hashing helpers that back idempotent workflow preparation.

pub mod conversation;
pub mod result;
pub mod seed;
pub mod workflow;

pub use conversation::{BasicConversation, ConversationBatch, Interaction, InteractionKind};
pub use result::{
    BatchResult, EvaluationResult, InteractionResult, ScenarioAttemptResult, ScenarioResult,
    REQUEST_FAILED_REPLY,
};
pub use seed::{canonical_json, seed_hash};
pub use workflow::{
    CheckResult, CheckStatus, ErrorCode, LaunchResponse, SessionStatus, VerificationResult,
    WorkflowSession, WorkflowType,
};
