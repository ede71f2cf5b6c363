// Retry helpers shared by the fetcher, the sender and the listener
use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for `attempt` (0-based), capped, without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1_u64 << attempt.min(16);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// `base_backoff` plus up to 25% random jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt);
        let max_jitter = base.as_millis() as u64 / 4;
        if max_jitter == 0 {
            return base;
        }
        let jitter = rand::rng().random_range(0..=max_jitter);
        base + Duration::from_millis(jitter)
    }
}

/// Errors that can tell whether another attempt might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Runs `op` until it succeeds, fails with a permanent error, or the policy's
/// retries are used up. Returns the last error in the failure cases.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "{} failed, retrying in {:?}",
                    what,
                    delay
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
    use crate::model::ScraperError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        assert_eq!(policy.base_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.base_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.base_backoff(3), Duration::from_millis(800));
        assert_eq!(policy.base_backoff(4), Duration::from_millis(1_000));
        assert_eq!(policy.base_backoff(40), Duration::from_millis(1_000));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let policy = RetryPolicy::default();
        for attempt in 0..5 {
            let base = policy.base_backoff(attempt);
            let delay = policy.backoff(attempt);
            assert!(delay >= base);
            assert!(delay <= base + base / 4);
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, ScraperError> = retry(&fast_policy(3), "fetch", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(ScraperError::Timeout) } else { Ok(n) }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ScraperError> = retry(&fast_policy(2), "fetch", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScraperError::HttpError("connection refused".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ScraperError> = retry(&fast_policy(5), "fetch", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScraperError::InvalidResponse(404))
        })
        .await;
        assert!(matches!(result, Err(ScraperError::InvalidResponse(404))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
