use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::EvaluationConfig;
use crate::error::JudgeError;
use crate::judge::Judge;
use crate::parse::parse_json_output;
use crate::providers::attach_metadata;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Judge backed by an OpenAI-compatible chat-completions API.
///
/// Sends a system + user message pair at temperature 0 and reads
/// `choices[0].message.content`.
#[derive(Debug)]
pub struct OpenAiJudge {
    client: reqwest::Client,
    config: EvaluationConfig,
}

impl OpenAiJudge {
    pub fn new(client: reqwest::Client, config: EvaluationConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> &str {
        self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

impl Judge for OpenAiJudge {
    fn name(&self) -> &str {
        "openai"
    }

    fn build_prompt(
        &self,
        user_message: Option<&str>,
        generated_text: &str,
        expected_text: &str,
    ) -> String {
        let user_msg = user_message.unwrap_or("(no user message provided)");
        [
            "You are an expert text evaluator. Score generated vs expected for semantic similarity, factual accuracy, completeness.",
            "Provide only JSON: {\"match_level\": <0-5>, \"justification\": \"<<=35 words reason>\", \"metadata\": {}}",
            "Scale: 5 perfect; 4 excellent; 3 good; 2 moderate gaps; 1 poor; 0 no match/incorrect.",
            "",
            "User Message:", "\"\"\"", user_msg, "\"\"\"",
            "",
            "Expected:", "\"\"\"", expected_text, "\"\"\"",
            "",
            "Generated:", "\"\"\"", generated_text, "\"\"\"",
        ]
        .join("\n")
    }

    async fn call_llm(&self, prompt: &str) -> Result<Value, JudgeError> {
        let model = self.config.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
        let body = json!({
            "model": model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": "You are an evaluation assistant."},
                {"role": "user", "content": prompt}
            ]
        });

        debug!(endpoint = self.endpoint(), model, "sending openai judge request");

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
            .ok_or_else(|| {
                JudgeError::Parse(format!("unexpected response format: {response_json}"))
            })?;

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

#[cfg(test)]
mod tests {
    use super::*;

    fn judge() -> OpenAiJudge {
        OpenAiJudge::new(reqwest::Client::new(), EvaluationConfig::new())
    }

    #[test]
    fn prompt_carries_scale_and_texts() {
        let prompt = judge().build_prompt(Some("What is 2+2?"), "Four", "4");
        assert!(prompt.contains("Scale: 5 perfect"));
        assert!(prompt.contains("What is 2+2?"));
        assert!(prompt.contains("Generated:"));
        assert!(prompt.contains("Four"));
    }

    #[test]
    fn default_endpoint_when_unconfigured() {
        assert_eq!(judge().endpoint(), DEFAULT_API_URL);
    }

    #[test]
    fn configured_endpoint_wins() {
        let j = OpenAiJudge::new(
            reqwest::Client::new(),
            EvaluationConfig::new().with_api_url("http://localhost:9999/v1/chat/completions"),
        );
        assert_eq!(j.endpoint(), "http://localhost:9999/v1/chat/completions");
    }
}
