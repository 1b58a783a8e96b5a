//! Conversation simulator: drives a target agent through scripted multi-turn
//! scenarios over HTTP and scores every reply with the configured judges.
//!
//! Failure containment is the organizing principle: a failed turn never
//! aborts its scenario, a failed judge never blocks its siblings, and a
//! crashed scenario task never halts the batch. Everything that goes wrong is
//! materialized into the [`BatchResult`](levelapp_core::BatchResult).

pub mod adapter;
pub mod endpoint;
pub mod simulator;
pub mod sink;
pub mod summary;

pub use adapter::adapt_agent_response;
pub use endpoint::{AGENT_TIMEOUT, EndpointDescriptor};
pub use simulator::ConversationSimulator;
pub use sink::{ResultSink, SinkError, TracingSink};
pub use summary::{JustificationEntry, summarize_justifications};
