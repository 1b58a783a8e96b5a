use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::error::JudgeError;
use crate::judge::{Judge, rubric_prompt};
use crate::parse::parse_json_output;
use crate::providers::attach_metadata;

const DEFAULT_MODEL: &str = "claude-v1";

/// Judge backed by the Claude text-completion API (`<api_url>/v1/complete`),
/// reading the `completion` field.
#[derive(Debug)]
pub struct ClaudeJudge {
    client: reqwest::Client,
    config: EvaluationConfig,
}

impl ClaudeJudge {
    pub fn new(client: reqwest::Client, config: EvaluationConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> Result<String, JudgeError> {
        let api_url = self
            .config
            .api_url
            .as_deref()
            .ok_or_else(|| JudgeError::Configuration("claude judge requires api_url".into()))?;
        Ok(format!("{}/v1/complete", api_url.trim_end_matches('/')))
    }
}

impl Judge for ClaudeJudge {
    fn name(&self) -> &str {
        "claude"
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
        let url = self.endpoint()?;
        let model = self.config.model_id.as_deref().unwrap_or(DEFAULT_MODEL);

        let mut body = json!({
            "prompt": prompt,
            "model": model,
            "max_tokens_to_sample": 1000,
            "temperature": 0,
            "stop_sequences": ["\n\n"],
            "user": Uuid::new_v4().to_string(),
        });
        if let Value::Object(map) = &mut body {
            for (key, value) in self.config.llm_config.to_json() {
                map.insert(key, value);
            }
        }

        debug!(endpoint = %url, model, "sending claude judge request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key.expose_secret());
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

        let output = response_json
            .get("completion")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut parsed = parse_json_output(output.trim());
        if let Some(Value::Object(meta)) = response_json.get("metadata") {
            let entries: Vec<(&str, Value)> = meta
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect();
            attach_metadata(&mut parsed, entries);
        }
        Ok(parsed)
    }
}
