use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Sampling options forwarded to the provider with each judge call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    /// Provider-specific extras merged into the request verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 150,
            top_p: Some(0.9),
            top_k: Some(5),
            extra: Map::new(),
        }
    }
}

impl LlmOptions {
    /// Render the options as a JSON object for providers that splice them
    /// into the request body.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("temperature".to_owned(), self.temperature.into());
        map.insert("max_tokens".to_owned(), self.max_tokens.into());
        if let Some(top_p) = self.top_p {
            map.insert("top_p".to_owned(), top_p.into());
        }
        if let Some(top_k) = self.top_k {
            map.insert("top_k".to_owned(), top_k.into());
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// Per-provider judge configuration.
///
/// The API key is wrapped in [`SecretString`] so it never lands in logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationConfig {
    pub api_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model_id: Option<String>,
    #[serde(default)]
    pub llm_config: LlmOptions,
}

impl EvaluationConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Replace the sampling options.
    #[must_use]
    pub fn with_llm_config(mut self, options: LlmOptions) -> Self {
        self.llm_config = options;
        self
    }
}
