//! Fixed-count retry for gateway requests.
//!
//! Connection-class errors (see [`ScraperError::is_transient`]) are retried
//! after a constant sleep; everything else is returned on the first failure.
//! There is no growth in the delay and no jitter: the gateway and the target
//! sites are throttled by the fixed pauses alone.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    #[must_use]
    pub fn from_secs(max_attempts: u32, delay_secs: u64) -> Self {
        Self::new(max_attempts, Duration::from_secs(delay_secs))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_MAX_ATTEMPTS, 5)
    }
}

/// Runs `operation` up to `policy.max_attempts` times.
///
/// | Attempt | Before the attempt |
/// |---------|--------------------|
/// | 1       | nothing            |
/// | 2       | sleep `delay`      |
/// | 3       | sleep `delay`      |
///
/// When every attempt fails with a transient error the error from the last
/// attempt is returned as-is. Non-transient errors are returned immediately.
pub async fn retry_request<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, max_attempts, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }
                if attempt >= max_attempts {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "giving up after final attempt"
                    );
                    return Err(err);
                }
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = policy.delay.as_secs(),
                    error = %err,
                    "connection error, retrying after fixed delay"
                );
            }
        }

        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
