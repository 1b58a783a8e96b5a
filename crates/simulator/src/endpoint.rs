use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Value, json};
use tracing::warn;

/// Transport timeout for agent calls. Agents under test can be slow; the
/// containment story lives at the turn level, not the socket level.
pub const AGENT_TIMEOUT: Duration = Duration::from_secs(900);

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("placeholder regex is valid"));

/// Describes how to reach the agent under test.
///
/// When no payload template is supplied, each turn posts the default
/// `{"prompt": "<user_message>"}`. A template is any JSON value whose string
/// nodes may contain `${var}` placeholders, substituted per turn from the
/// variable map (at minimum `user_message`).
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub payload_template: Option<Value>,
    pub timeout: Duration,
}

impl EndpointDescriptor {
    /// Describe an endpoint with default timeout and no extra headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            payload_template: None,
            timeout: AGENT_TIMEOUT,
        }
    }

    /// Add a request header (e.g. `x-model-id`).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Use a custom request payload template with `${var}` placeholders.
    #[must_use]
    pub fn with_payload_template(mut self, template: Value) -> Self {
        self.payload_template = Some(template);
        self
    }

    /// Override the transport timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the request payload for one turn.
    #[must_use]
    pub fn render_payload(&self, variables: &HashMap<String, String>) -> Value {
        match &self.payload_template {
            Some(template) => substitute(template, variables),
            None => {
                let user_message = variables.get("user_message").cloned().unwrap_or_default();
                json!({"prompt": user_message})
            }
        }
    }
}

/// Recursively substitute `${var}` placeholders in every string node.
/// Unknown placeholders are left in place and logged.
fn substitute(value: &Value, variables: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => {
            let replaced = PLACEHOLDER_RE.replace_all(s, |caps: &regex::Captures<'_>| {
                variables
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_owned())
            });
            if PLACEHOLDER_RE.is_match(&replaced) {
                warn!(payload = %replaced, "unsubstituted placeholder in payload");
            }
            Value::String(replaced.into_owned())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, variables)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute(v, variables)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(user_message: &str) -> HashMap<String, String> {
        HashMap::from([("user_message".to_owned(), user_message.to_owned())])
    }

    #[test]
    fn default_payload_wraps_user_message() {
        let endpoint = EndpointDescriptor::new("http://agent.local/chat");
        assert_eq!(
            endpoint.render_payload(&vars("Hello")),
            json!({"prompt": "Hello"})
        );
    }

    #[test]
    fn template_substitution_is_recursive() {
        let endpoint = EndpointDescriptor::new("http://agent.local/chat").with_payload_template(
            json!({
                "input": {"text": "${user_message}"},
                "messages": [{"role": "user", "content": "${user_message}"}],
                "stream": false
            }),
        );
        let payload = endpoint.render_payload(&vars("Hi there"));
        assert_eq!(payload["input"]["text"], "Hi there");
        assert_eq!(payload["messages"][0]["content"], "Hi there");
        assert_eq!(payload["stream"], false);
    }

    #[test]
    fn unknown_placeholder_left_in_place() {
        let endpoint = EndpointDescriptor::new("http://agent.local")
            .with_payload_template(json!({"prompt": "${user_message} ${missing}"}));
        let payload = endpoint.render_payload(&vars("Hi"));
        assert_eq!(payload["prompt"], "Hi ${missing}");
    }

    #[test]
    fn builder_collects_headers() {
        let endpoint = EndpointDescriptor::new("http://agent.local")
            .with_header("x-model-id", "llama-70b")
            .with_header("Authorization", "Bearer t");
        assert_eq!(endpoint.headers.len(), 2);
        assert_eq!(endpoint.timeout, AGENT_TIMEOUT);
    }
}
