use std::time::Duration;

use tracing::warn;

use crate::error::JudgeError;

/// Number of attempts per judge call, including the first.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Backoff wait before retry `attempt` (1-based): `min(max(2^(attempt-1), 1s), 8s)`.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_secs(exp.clamp(1, 8))
}

/// Run `op` with exponential backoff, retrying only transport-level errors.
///
/// HTTP status errors after a completed exchange, parse failures, and
/// configuration faults are surfaced immediately. The sleep between attempts
/// is a suspension point; the loop itself holds no shared state.
pub async fn retry_transport<F, Fut, T>(max_attempts: u32, mut op: F) -> Result<T, JudgeError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, JudgeError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(JudgeError::Transport(reason)) if attempt < max_attempts => {
                let delay = backoff_delay(attempt);
                warn!(attempt, delay_s = delay.as_secs(), %reason, "judge call failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_schedule_is_1_2_4_capped_at_8() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
        assert_eq!(backoff_delay(10), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_errors_up_to_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry_transport(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(JudgeError::Transport("connection reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transport(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(JudgeError::Transport("dns failure".into())) }
        })
        .await;
        assert!(matches!(result, Err(JudgeError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn api_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transport(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(JudgeError::Api {
                    status: 500,
                    body: "upstream down".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(JudgeError::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
