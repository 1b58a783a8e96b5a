use serde_json::{Value, json};
use tracing::debug;

use crate::config::EvaluationConfig;
use crate::error::JudgeError;
use crate::judge::{Judge, rubric_prompt};
use crate::parse::parse_json_output;
use crate::providers::attach_metadata;

/// Judge for bare single-prompt HTTP endpoints (self-hosted models).
///
/// POSTs `{"prompt": ...}` with an `x-model-id` header and probes the common
/// reply keys (`response`, `text`, `content`, `message`, `output`) for the
/// model text.
#[derive(Debug)]
pub struct GenericApiJudge {
    client: reqwest::Client,
    config: EvaluationConfig,
}

impl GenericApiJudge {
    pub fn new(client: reqwest::Client, config: EvaluationConfig) -> Self {
        Self { client, config }
    }

    fn extract_output(response_json: &Value) -> String {
        if let Some(s) = response_json.as_str() {
            return s.to_owned();
        }
        for key in ["response", "text", "content", "message", "output"] {
            if let Some(s) = response_json.get(key).and_then(Value::as_str) {
                return s.to_owned();
            }
        }
        response_json.to_string()
    }
}

impl Judge for GenericApiJudge {
    fn name(&self) -> &str {
        "generic"
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        rubric_prompt(user_message, generated_text, expected_text)
    }

    async fn call_llm(&self, prompt: &str) -> Result<Value, JudgeError> {
        let url = self
            .config
            .api_url
            .as_deref()
            .ok_or_else(|| JudgeError::Configuration("generic judge requires api_url".into()))?;

        debug!(endpoint = url, "sending generic judge request");

        let mut request = self.client.post(url).json(&json!({"prompt": prompt}));
        if let Some(model_id) = &self.config.model_id {
            request = request.header("x-model-id", model_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| JudgeError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| JudgeError::Parse(format!("failed to parse API response: {e}")))?;

        let output = Self::extract_output(&response_json);
        let mut parsed = parse_json_output(output.trim());
        attach_metadata(
            &mut parsed,
            vec![
                (
                    "model_used",
                    self.config.model_id.clone().map_or(Value::Null, Value::from),
                ),
                ("evaluator", json!("generic_api")),
            ],
        );
        Ok(parsed)
    }
}
