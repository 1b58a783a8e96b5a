use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use levelapp_core::BatchResult;

/// Error from a persistence sink.
#[derive(Debug, Error)]
#[error("sink error: {0}")]
pub struct SinkError(pub String);

/// Receives finished batch results for persistence.
///
/// The simulator emits the envelope verbatim; what a sink does with it
/// (document store, file, message bus) is its own business. Sink failures
/// are logged, never propagated into the batch result.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, name: &str, result: &BatchResult) -> Result<(), SinkError>;
}

/// Default sink: logs a one-line summary of the finished batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl ResultSink for TracingSink {
    async fn persist(&self, name: &str, result: &BatchResult) -> Result<(), SinkError> {
        info!(
            name,
            scenarios = result.scenarios.len(),
            duration_s = result.total_duration_seconds,
            "batch result ready"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn tracing_sink_accepts_results() {
        let result = BatchResult {
            scenarios: vec![],
            average_scores: BTreeMap::new(),
            global_justifications: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total_duration_seconds: 0.0,
            average_execution_time: 0.0,
        };
        TracingSink.persist("smoke", &result).await.unwrap();
    }
}
