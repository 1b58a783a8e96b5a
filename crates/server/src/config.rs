use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use levelapp_evaluators::{EvaluationConfig, EvaluationService, LlmOptions};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var regex is valid"));

/// Top-level configuration, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct LevelappConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Judge provider configurations, keyed by short name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// External document store reference (consumed by a persistence sink).
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// RAG pipeline defaults.
    #[serde(default)]
    pub rag: RagConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

/// One judge provider entry. String fields may reference environment
/// variables as `${VAR}`.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    #[serde(default)]
    pub llm_config: LlmOptions,
}

/// External document store reference.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: String,
    pub credentials_path: Option<String>,
}

/// RAG pipeline defaults.
#[derive(Debug, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chatbot_base_url")]
    pub chatbot_base_url: String,
    #[serde(default = "default_chatbot_chat_path")]
    pub chatbot_chat_path: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chatbot_base_url: default_chatbot_base_url(),
            chatbot_chat_path: default_chatbot_chat_path(),
        }
    }
}

fn default_chatbot_base_url() -> String {
    "http://127.0.0.1:8000".to_owned()
}

fn default_chatbot_chat_path() -> String {
    "/".to_owned()
}

impl LevelappConfig {
    /// Load configuration from a TOML file. A missing file yields defaults;
    /// a malformed file is a bootstrap failure.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            warn!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }
}

/// Expand `${VAR}` references from the process environment. Unknown
/// variables are left in place.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    ENV_VAR_RE
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_owned())
        })
        .into_owned()
}

fn expand_opt(value: Option<&String>) -> Option<String> {
    value
        .map(|v| expand_env_vars(v))
        .filter(|v| !v.is_empty())
}

/// Register every provider with a usable API key on the evaluation service.
/// Providers without a key after expansion are skipped with a warning, the
/// same way the service refuses to dispatch to half-configured judges.
pub fn configure_evaluation_service(config: &LevelappConfig, service: &EvaluationService) {
    for (name, provider) in &config.providers {
        let Some(api_key) = expand_opt(provider.api_key.as_ref()) else {
            warn!(provider = %name, "skipping provider (missing API key)");
            continue;
        };
        let mut evaluation = EvaluationConfig::new()
            .with_api_key(api_key)
            .with_llm_config(provider.llm_config.clone());
        if let Some(api_url) = expand_opt(provider.api_url.as_ref()) {
            evaluation = evaluation.with_api_url(api_url);
        }
        if let Some(model_id) = expand_opt(provider.model_id.as_ref()) {
            evaluation = evaluation.with_model_id(model_id);
        }
        service.set_config(name.clone(), evaluation);
    }
}
