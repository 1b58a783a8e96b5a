use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Literal recorded as the agent reply when the transport-level call fails.
pub const REQUEST_FAILED_REPLY: &str = "Request failed";

/// Verdict of a single judge on a single reply.
///
/// `match_level` is on the fixed 0-5 rubric (5 perfect, 0 no match).
/// A failed evaluation is represented by level 0 plus a `metadata.error`
/// entry, never by an absent result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub match_level: u8,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl EvaluationResult {
    /// Create a result from a level and justification.
    pub fn new(match_level: u8, justification: impl Into<String>) -> Self {
        Self {
            match_level,
            justification: justification.into(),
            metadata: Map::new(),
        }
    }

    /// The canonical "evaluation failed" sentinel: level 0 with
    /// `metadata.error` set to the failure description.
    pub fn failure(error: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_owned(), Value::String(error.into()));
        Self {
            match_level: 0,
            justification: String::new(),
            metadata,
        }
    }

    /// Whether this result represents a failed evaluation.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.metadata.contains_key("error")
    }
}

/// Outcome of one turn against the agent, with per-provider judge verdicts.
///
/// `evaluation_results` is empty exactly when the transport call failed, in
/// which case `agent_reply` holds [`REQUEST_FAILED_REPLY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResult {
    pub user_message: String,
    pub agent_reply: String,
    pub reference_reply: String,
    #[serde(default)]
    pub reference_metadata: Map<String, Value>,
    #[serde(default)]
    pub generated_metadata: Map<String, Value>,
    #[serde(default)]
    pub evaluation_results: BTreeMap<String, EvaluationResult>,
}

impl InteractionResult {
    /// Record a transport-level failure for a turn. The scenario continues.
    pub fn transport_failure(
        user_message: impl Into<String>,
        reference_reply: impl Into<String>,
        reference_metadata: Map<String, Value>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            agent_reply: REQUEST_FAILED_REPLY.to_owned(),
            reference_reply: reference_reply.into(),
            reference_metadata,
            generated_metadata: Map::new(),
            evaluation_results: BTreeMap::new(),
        }
    }
}

/// One sequential replay of a scenario's interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAttemptResult {
    /// 1-based attempt index.
    pub attempt_id: u32,
    /// Conversation identifier handed to downstream systems (`batch-<n>`).
    pub conversation_id: String,
    pub interactions: Vec<InteractionResult>,
    /// Per-provider mean match level over this attempt's turns.
    pub average_scores: BTreeMap<String, f64>,
    pub execution_time_seconds: f64,
}

/// All attempts of a single scenario, with cross-attempt averages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: Uuid,
    #[serde(default)]
    pub description: String,
    pub attempts: Vec<ScenarioAttemptResult>,
    pub average_scores: BTreeMap<String, f64>,
}

/// The full result envelope for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Per-scenario results, in the input order of the batch.
    pub scenarios: Vec<ScenarioResult>,
    /// Per-provider mean over all scenarios.
    pub average_scores: BTreeMap<String, f64>,
    /// Up to five merged justification bullets per provider.
    pub global_justifications: BTreeMap<String, Vec<String>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_duration_seconds: f64,
    /// Mean attempt execution time across all scenarios.
    pub average_execution_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_has_error_metadata() {
        let r = EvaluationResult::failure("judge timed out");
        assert_eq!(r.match_level, 0);
        assert!(r.is_failure());
        assert_eq!(r.metadata["error"], "judge timed out");
    }

    #[test]
    fn transport_failure_shape() {
        let r = InteractionResult::transport_failure("Hello", "Hi", Map::new());
        assert_eq!(r.agent_reply, REQUEST_FAILED_REPLY);
        assert!(r.evaluation_results.is_empty());
        assert!(r.generated_metadata.is_empty());
    }

    #[test]
    fn evaluation_result_roundtrip_preserves_metadata() {
        let mut r = EvaluationResult::new(4, "close match");
        r.metadata
            .insert("input_tokens".to_owned(), Value::from(120));
        r.metadata
            .insert("custom_field".to_owned(), Value::from("kept"));
        let json = serde_json::to_string(&r).unwrap();
        let back: EvaluationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.metadata["custom_field"], "kept");
    }

    #[test]
    fn canonical_encoding_survives_a_parse_roundtrip() {
        let mut attempt = ScenarioAttemptResult {
            attempt_id: 1,
            conversation_id: "batch-1".to_owned(),
            interactions: vec![InteractionResult {
                user_message: "Hello".to_owned(),
                agent_reply: "Hi".to_owned(),
                reference_reply: "Hi".to_owned(),
                reference_metadata: Map::new(),
                generated_metadata: Map::new(),
                evaluation_results: BTreeMap::new(),
            }],
            average_scores: BTreeMap::new(),
            execution_time_seconds: 0.5,
        };
        attempt
            .average_scores
            .insert("openai".to_owned(), 5.0);
        let batch = BatchResult {
            scenarios: vec![ScenarioResult {
                scenario_id: uuid::Uuid::new_v4(),
                description: "greeting".to_owned(),
                attempts: vec![attempt],
                average_scores: BTreeMap::new(),
            }],
            average_scores: BTreeMap::new(),
            global_justifications: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total_duration_seconds: 1.25,
            average_execution_time: 0.5,
        };

        let value = serde_json::to_value(&batch).unwrap();
        let canonical = crate::seed::canonical_json(&value);
        let reparsed: Value = serde_json::from_str(&canonical).unwrap();
        assert_eq!(crate::seed::canonical_json(&reparsed), canonical);
    }

    #[test]
    fn batch_result_serializes_timestamps_as_strings() {
        let batch = BatchResult {
            scenarios: vec![],
            average_scores: BTreeMap::new(),
            global_justifications: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total_duration_seconds: 0.0,
            average_execution_time: 0.0,
        };
        let value = serde_json::to_value(&batch).unwrap();
        assert!(value["started_at"].is_string());
        assert!(value["finished_at"].is_string());
    }
}
