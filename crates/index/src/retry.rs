use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::retrieval::RetrievalError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff_ms: 50,
            max_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.initial_backoff_ms,
            settings.max_backoff_ms,
        )
    }

    /// Backoff before retry number `attempt` (1-based), doubling up to the cap
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run a retrieval call, retrying transient failures. A malformed response
    /// is returned at once since asking again will not fix it.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, RetrievalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RetrievalError>>,
    {
        let mut attempt = 0;
        loop {
            let error = match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "Retrieval succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_transient() || attempt > self.max_retries {
                warn!(operation, attempts = attempt, error = %error, "Retrieval failed");
                return Err(error);
            }

            let backoff = self.backoff(attempt);
            warn!(
                operation,
                attempt,
                max_retries = self.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retrieval failed, retrying"
            );
            sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_doubles_to_cap() {
        let policy = RetryPolicy::new(5, 10, 35);
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(35));
        assert_eq!(policy.backoff(60), Duration::from_millis(35));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failure() {
        let policy = RetryPolicy::new(2, 1, 2);
        let calls = AtomicUsize::new(0);
        let result = policy
            .retry("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RetrievalError::Unavailable("boom".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(1, 1, 1);
        let calls = AtomicUsize::new(0);
        let result: Result<(), RetrievalError> = policy
            .retry("down", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetrievalError::Timeout(Duration::from_millis(5)))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_response_not_retried() {
        let policy = RetryPolicy::new(3, 1, 1);
        let calls = AtomicUsize::new(0);
        let result: Result<(), RetrievalError> = policy
            .retry("garbled", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RetrievalError::InvalidResponse("missing result".to_string()))
            })
            .await;
        assert!(matches!(result, Err(RetrievalError::InvalidResponse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
