use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// The rolling rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Error returned when a project exceeds its prepare-call budget.
#[derive(Debug)]
pub struct RateLimitExceeded {
    /// Seconds until the caller can retry.
    pub retry_after: u64,
    /// The configured per-window cap.
    pub limit: usize,
}

/// Per-project rate limiter over an exact rolling 60-second window.
///
/// Timestamps are pruned on every check, so a project that stops calling
/// costs nothing after one window. A denied call does not consume a slot:
/// the cap is the number of *admitted* calls per window.
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_per_window` calls per project per
    /// rolling minute.
    #[must_use]
    pub fn new(max_per_window: usize) -> Self {
        Self {
            max_per_window,
            window: RATE_LIMIT_WINDOW,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn with_window(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// The configured per-window cap.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.max_per_window
    }

    /// Admit or reject one call for `project_id`.
    pub async fn check(&self, project_id: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let timestamps = buckets.entry(project_id.to_owned()).or_default();
        timestamps.retain(|ts| now.duration_since(*ts) < self.window);

        if timestamps.len() >= self.max_per_window {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_secs()
                .max(1);
            return Err(RateLimitExceeded {
                retry_after,
                limit: self.max_per_window,
            });
        }

        timestamps.push(now);
        Ok(())
    }
}
