//! RAG retrieval evaluation pipeline.
//!
//! Three stateful steps over a shared session map: scrape a source page into
//! reorderable chunks, generate a grounded "golden" answer from
//! human-selected chunks, then query the chatbot under test and score its
//! answer with lexical metrics and an LLM judge.

pub mod comparator;
pub mod error;
pub mod events;
pub mod generation;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod scrape;

pub use comparator::{JUDGE_STRONG_THRESHOLD, JUDGE_TIE_SCORE, LlmComparison, compare_answers};
pub use error::RagError;
pub use events::{RagEvent, RagEventLog};
pub use generation::{ChatMessage, GenerationConfig, GenerationError, GenerationService};
pub use metrics::{RagMetrics, compute_metrics};
pub use pipeline::{
    ChunkSelectionRequest, NOT_FOUND_SENTINEL, RagEvaluationRequest, RagEvaluationResult,
    RagInitRequest, RagInitResponse, ExpectedAnswerResponse, RagPipeline,
};
pub use scrape::{ChunkInfo, chunk_paragraphs, extract_paragraphs, scrape_page};
