use rand::Rng;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::EvaluationConfig;
use crate::error::JudgeError;
use crate::judge::{Judge, rubric_prompt};
use crate::parse::parse_json_output;
use crate::providers::attach_metadata;

/// Judge backed by the IONOS inference API.
///
/// Targets the single-prompt prediction endpoint
/// `<api_url>/<model_id>/predictions` and reads `properties.output`. Each
/// request carries a fresh 16-bit seed so repeated evaluations don't collapse
/// onto a cached completion.
#[derive(Debug)]
pub struct IonosJudge {
    client: reqwest::Client,
    config: EvaluationConfig,
}

impl IonosJudge {
    pub fn new(client: reqwest::Client, config: EvaluationConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> Result<String, JudgeError> {
        let api_url = self
            .config
            .api_url
            .as_deref()
            .ok_or_else(|| JudgeError::Configuration("ionos judge requires api_url".into()))?;
        let model_id = self
            .config
            .model_id
            .as_deref()
            .ok_or_else(|| JudgeError::Configuration("ionos judge requires model_id".into()))?;
        Ok(format!(
            "{}/{model_id}/predictions",
            api_url.trim_end_matches('/')
        ))
    }
}

impl Judge for IonosJudge {
    fn name(&self) -> &str {
        "ionos"
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

        let mut option = self.config.llm_config.to_json();
        let seed: u16 = rand::thread_rng().r#gen();
        option.insert("seed".to_owned(), seed.into());

        let body = json!({
            "properties": {"input": prompt},
            "option": option,
        });

        debug!(endpoint = %url, "sending ionos judge request");

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
            .pointer("/properties/output")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut parsed = parse_json_output(output.trim());
        attach_metadata(
            &mut parsed,
            vec![
                (
                    "input_tokens",
                    response_json.pointer("/metadata/inputTokens").cloned().unwrap_or(Value::Null),
                ),
                (
                    "output_tokens",
                    response_json.pointer("/metadata/outputTokens").cloned().unwrap_or(Value::Null),
                ),
            ],
        );
        Ok(parsed)
    }
}
