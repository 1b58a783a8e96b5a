use thiserror::Error;
use uuid::Uuid;

use crate::generation::GenerationError;

/// Errors from the RAG pipeline steps.
#[derive(Debug, Error)]
pub enum RagError {
    /// The chatbot's `/init` warm-up call failed.
    #[error("RAG initialization failed: {0}")]
    InitFailed(String),

    /// Fetching or parsing the source page failed.
    #[error("page scrape failed: {0}")]
    Scrape(String),

    /// The referenced session is unknown or already cleaned up.
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    /// Golden-answer generation failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The chatbot under test could not be queried on any path.
    #[error("chatbot query failed: {0}")]
    ChatbotUnavailable(String),
}
