//! Text generation across providers, mirroring the evaluation service's
//! provider registry (provider + messages → text output).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// One chat message handed to a generation provider.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_owned(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }
}

/// Per-provider generation configuration.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model_id: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 512,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

/// Errors from a generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no configuration set for generation provider: {0}")]
    UnknownProvider(String),

    #[error("generation not supported for provider: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Provider-keyed text generation service.
pub struct GenerationService {
    client: reqwest::Client,
    configs: RwLock<HashMap<String, GenerationConfig>>,
}

impl GenerationService {
    /// Create a service with a dedicated HTTP client.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a service around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace one provider's configuration.
    pub fn set_config(&self, provider: impl Into<String>, config: GenerationConfig) {
        self.configs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(provider.into(), config);
    }

    /// Generate text from chat messages with the given provider. An explicit
    /// `model` overrides the configured one.
    pub async fn generate(
        &self,
        provider: &str,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, GenerationError> {
        let config = self
            .configs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(provider)
            .cloned()
            .ok_or_else(|| GenerationError::UnknownProvider(provider.to_owned()))?;

        match provider {
            "openai" => self.generate_openai(&config, messages, model).await,
            other => Err(GenerationError::Unsupported(other.to_owned())),
        }
    }

    async fn generate_openai(
        &self,
        config: &GenerationConfig,
        messages: &[ChatMessage],
        model: Option<&str>,
    ) -> Result<String, GenerationError> {
        let url = config.api_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
        let model = model
            .or(config.model_id.as_deref())
            .unwrap_or("gpt-4o-mini");
        let body = json!({
            "model": model,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "messages": messages,
        });

        debug!(url, model, "sending generation request");

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let content = response_json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GenerationError::Parse(format!("unexpected response format: {response_json}"))
            })?;

        Ok(content.trim().to_owned())
    }
}

impl Default for GenerationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_provider_is_an_error() {
        let service = GenerationService::with_client(reqwest::Client::new());
        let err = service.generate("openai", &[], None).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn ionos_generation_is_unsupported() {
        let service = GenerationService::with_client(reqwest::Client::new());
        service.set_config("ionos", GenerationConfig::new());
        let err = service.generate("ionos", &[], None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unsupported(_)));
    }

    #[test]
    fn chat_message_constructors() {
        let msg = ChatMessage::system("be strict");
        assert_eq!(msg.role, "system");
        let msg = ChatMessage::user("q");
        assert_eq!(msg.role, "user");
    }
}
