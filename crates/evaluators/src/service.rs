use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use levelapp_core::EvaluationResult;

use crate::config::EvaluationConfig;
use crate::error::{ConfigError, JudgeError};
use crate::judge::DynJudge;
use crate::keypoint::{KEY_POINT_METHOD, extract_key_point};
use crate::parse::interpret_judge_output;
use crate::providers::{ClaudeJudge, GenericApiJudge, IonosJudge, MistralJudge, OpenAiJudge};
use crate::retry::{DEFAULT_ATTEMPTS, retry_transport};

/// Judge HTTP call timeout.
pub const JUDGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Constructs a judge for a provider from the shared HTTP client and its
/// current configuration.
pub type JudgeFactory =
    Arc<dyn Fn(reqwest::Client, EvaluationConfig) -> Arc<dyn DynJudge> + Send + Sync>;

/// Wrap a judge constructor as a registry factory.
pub fn judge_factory<J, F>(constructor: F) -> JudgeFactory
where
    J: crate::judge::Judge + 'static,
    F: Fn(reqwest::Client, EvaluationConfig) -> J + Send + Sync + 'static,
{
    Arc::new(move |client, config| Arc::new(constructor(client, config)) as Arc<dyn DynJudge>)
}

/// Wrap an existing judge instance as a registry factory. The instance is
/// shared across evaluations; client and configuration are ignored.
pub fn shared_judge(judge: Arc<dyn DynJudge>) -> JudgeFactory {
    Arc::new(move |_, _| Arc::clone(&judge))
}

/// Dispatches evaluation requests to the configured judge providers.
///
/// The service is a registry, not a switch: the five built-in families are
/// pre-registered and additional judges plug in via [`register_judge`]
/// without touching dispatch code. Judge failures never escape
/// [`evaluate_response`] — they are materialized as level-0 results.
///
/// [`register_judge`]: EvaluationService::register_judge
pub struct EvaluationService {
    client: reqwest::Client,
    factories: RwLock<HashMap<String, JudgeFactory>>,
    configs: RwLock<HashMap<String, EvaluationConfig>>,
}

impl EvaluationService {
    /// Create a service with the built-in judge families registered and a
    /// shared HTTP client enforcing the judge call timeout.
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(JUDGE_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::ClientInit(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Create a service around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        let mut factories: HashMap<String, JudgeFactory> = HashMap::new();
        factories.insert("openai".to_owned(), judge_factory(OpenAiJudge::new));
        factories.insert("ionos".to_owned(), judge_factory(IonosJudge::new));
        factories.insert("claude".to_owned(), judge_factory(ClaudeJudge::new));
        factories.insert("mistral".to_owned(), judge_factory(MistralJudge::new));
        factories.insert("generic".to_owned(), judge_factory(GenericApiJudge::new));

        Self {
            client,
            factories: RwLock::new(factories),
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a judge factory under a provider name.
    pub fn register_judge(&self, provider: impl Into<String>, factory: JudgeFactory) {
        let provider = provider.into();
        self.factories
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(provider, factory);
    }

    /// Register or atomically replace one provider's configuration.
    pub fn set_config(&self, provider: impl Into<String>, config: EvaluationConfig) {
        let provider = provider.into();
        info!(provider = %provider, "registering judge provider configuration");
        self.configs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(provider, config);
    }

    /// Names of all providers with a configuration set.
    #[must_use]
    pub fn configured_providers(&self) -> Vec<String> {
        self.configs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Whether a provider has a configuration set.
    #[must_use]
    pub fn has_provider(&self, provider: &str) -> bool {
        self.configs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(provider)
    }

    fn resolve(&self, provider: &str) -> Result<(JudgeFactory, EvaluationConfig), ConfigError> {
        let config = self
            .configs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(provider)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProvider(provider.to_owned()))?;
        let factory = self
            .factories
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(provider)
            .cloned()
            .ok_or_else(|| ConfigError::InvalidConfig {
                provider: provider.to_owned(),
                reason: "no judge registered for provider".to_owned(),
            })?;
        Ok((factory, config))
    }

    /// Evaluate a generated reply against its reference with one provider.
    ///
    /// Fails only when the provider is unknown. Every other failure mode —
    /// transport exhaustion, API errors, unparseable judge output — is
    /// returned as a well-formed result with `match_level = 0` and
    /// `metadata.error` set.
    pub async fn evaluate_response(
        &self,
        provider: &str,
        output_text: &str,
        reference_text: &str,
        user_message: Option<&str>,
    ) -> Result<EvaluationResult, ConfigError> {
        let (factory, config) = self.resolve(provider)?;
        let judge = factory(self.client.clone(), config);

        let prompt = judge.build_prompt(user_message, output_text, reference_text);
        let mut result = match retry_transport(DEFAULT_ATTEMPTS, || judge.call_llm(&prompt)).await {
            Ok(output) => interpret_judge_output(output),
            Err(err) => {
                error!(provider, error = %err, "judge evaluation failed");
                EvaluationResult::failure(judge_failure_detail(&err))
            }
        };

        // Deterministic post-processing; best-effort and pure, so it can
        // never mask a successful judge verdict.
        let kp_user = user_message.map(extract_key_point).unwrap_or_default();
        result
            .metadata
            .insert("user_key_point".to_owned(), Value::String(kp_user));
        result.metadata.insert(
            "expected_key_point".to_owned(),
            Value::String(extract_key_point(reference_text)),
        );
        result.metadata.insert(
            "generated_key_point".to_owned(),
            Value::String(extract_key_point(output_text)),
        );
        result.metadata.insert(
            "key_point_method".to_owned(),
            Value::String(KEY_POINT_METHOD.to_owned()),
        );

        Ok(result)
    }
}

fn judge_failure_detail(err: &JudgeError) -> String {
    match err {
        JudgeError::Api { status, body } => format!("API request failed: HTTP {status}: {body}"),
        other => format!("API request failed: {other}"),
    }
}
