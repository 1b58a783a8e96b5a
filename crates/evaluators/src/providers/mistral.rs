use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::EvaluationConfig;
use crate::error::JudgeError;
use crate::judge::{Judge, rubric_prompt};
use crate::parse::parse_json_output;
use crate::providers::attach_metadata;

const DEFAULT_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const DEFAULT_MODEL: &str = "mistral-medium";

/// Judge backed by the Mistral chat-completions API.
#[derive(Debug)]
pub struct MistralJudge {
    client: reqwest::Client,
    config: EvaluationConfig,
}

impl MistralJudge {
    pub fn new(client: reqwest::Client, config: EvaluationConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> &str {
        self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

impl Judge for MistralJudge {
    fn name(&self) -> &str {
        "mistral"
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
        let model = self.config.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        debug!(endpoint = self.endpoint(), model, "sending mistral judge request");

        let mut request = self.client.post(self.endpoint()).json(&body);
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

        let content = response_json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut parsed = parse_json_output(content.trim());
        attach_metadata(
            &mut parsed,
            vec![
                (
                    "input_tokens",
                    response_json.pointer("/usage/prompt_tokens").cloned().unwrap_or(Value::Null),
                ),
                (
                    "output_tokens",
                    response_json
                        .pointer("/usage/completion_tokens")
                        .cloned()
                        .unwrap_or(Value::Null),
                ),
            ],
        );
        Ok(parsed)
    }
}
