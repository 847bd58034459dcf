//! Bounded retry for external submissions

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{Result, WhitelistError};

/// Bounded retry with a fixed backoff and a per-attempt timeout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first (at least 1)
    pub max_attempts: u32,
    /// Sleep between attempts
    pub backoff: Duration,
    /// Per-attempt deadline; expiry counts as a `PublishFailure`
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_millis(500), attempt_timeout: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn once(attempt_timeout: Duration) -> Self {
        Self { max_attempts: 1, backoff: Duration::ZERO, attempt_timeout }
    }

    /// Run `op` until it succeeds or attempts run out; returns the last error.
    /// Only use with idempotent operations.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_err = WhitelistError::PublishFailure(format!("{}: no attempt made", label));

        for attempt in 1..=attempts {
            let err = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => WhitelistError::PublishFailure(format!(
                    "{} timed out after {:?}",
                    label, self.attempt_timeout
                )),
            };

            warn!(label, attempt, attempts, error = %err, "Attempt failed");
            last_err = err;

            if attempt < attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(WhitelistError::PublishFailure("rejected".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("broken", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(WhitelistError::PublishFailure(format!("attempt {}", n)))
            })
            .await;
        assert_eq!(result, Err(WhitelistError::PublishFailure("attempt 1".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_publish_failure() {
        let policy = RetryPolicy::once(Duration::from_millis(10));
        let result: Result<()> = policy
            .run("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(WhitelistError::PublishFailure(msg)) if msg.contains("timed out")));
    }
}
