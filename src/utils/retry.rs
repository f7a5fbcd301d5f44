use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff around a fallible async call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// 第 n 次重試前的等待時間 (n 從 0 開始)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        "🔄 {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::error!("❌ {} gave up after {} attempts", label, attempt);
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ListingError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> ListingError {
        ListingError::ApiStatusError {
            status: 503,
            body: "busy".to_string(),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result = policy
            .run("chat completion", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(unavailable())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::ZERO);

        let result: Result<()> = policy
            .run("chat completion", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<()> = policy
            .run("chat completion", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ListingError::ApiStatusError {
                        status: 401,
                        body: "invalid key".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
