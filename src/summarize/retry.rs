// src/summarize/retry.rs
//! Retry policy for completion-service calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Backoff parameters consumed by [`retry`]. Attempts are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(300),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `failed_attempt`: base delay doubled
    /// per prior failure, plus a uniform random jitter.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(failed_attempt.saturating_sub(1));
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            exp
        } else {
            exp + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        }
    }
}

/// Runs `op` up to `policy.max_attempts` times, sleeping between attempts.
/// Returns the first success or the last error.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn delay_doubles_per_failed_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(600));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(300),
            jitter: Duration::from_millis(100),
        };
        for _ in 0..50 {
            let d = policy.delay_for(1);
            assert!(d >= Duration::from_millis(300));
            assert!(d <= Duration::from_millis(400));
        }
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(&fast_policy(2), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("first call fails".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(&fast_policy(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails".to_string()) }
        })
        .await;
        assert_eq!(result, Err("always fails".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_success_stops_retrying() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(&fast_policy(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
