use crate::error::ErrorCategory;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fixed-count, fixed-delay retry policy for delivery side effects
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Run an operation under a retry policy.
///
/// Permanent errors abort immediately; transient and rate-limited errors are
/// retried after the fixed delay until attempts run out.
pub async fn retry_fixed<T, F, Fut>(policy: RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.category() == ErrorCategory::Permanent => {
                error!("{} failed permanently: {}", op_name, e);
                return Err(e);
            }
            Err(e) => {
                warn!("{} failed on attempt {}/{}: {}", op_name, attempt, attempts, e);
                last_err = Some(e);
                if attempt < attempts {
                    info!("Retrying {} in {:?}", op_name, policy.delay);
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    error!("{}: max retries reached", op_name);
    Err(last_err.unwrap_or_else(|| crate::Error::Service(format!("{op_name} failed"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_fixed(policy(), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Smtp("connection reset".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_fixed(policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::AuthenticationFailed("bad password".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_fixed(policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Smtp("flaky".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
