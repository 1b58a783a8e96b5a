use thiserror::Error;

/// Errors from a single judge call.
///
/// Only [`JudgeError::Transport`] is retryable: an HTTP status error means
/// the exchange completed and is surfaced immediately.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Connection, DNS, TLS, or timeout failure before a complete exchange.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response from a completed exchange.
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// The judge was constructed with unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl JudgeError {
    /// Classify a reqwest failure: timeouts and connection faults are
    /// transport errors, everything else is a parse-level fault.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transport(err.to_string())
        } else {
            Self::Parse(err.to_string())
        }
    }
}

/// Errors surfaced by the evaluation service at the call site.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The provider has no registered configuration.
    #[error("no configuration set for provider: {0}")]
    UnknownProvider(String),

    /// A configuration was present but unusable.
    #[error("invalid configuration for provider {provider}: {reason}")]
    InvalidConfig { provider: String, reason: String },

    /// The shared HTTP client could not be constructed.
    #[error("HTTP client initialization failed: {0}")]
    ClientInit(String),
}
