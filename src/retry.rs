//! Retry with backoff for network calls
//!
//! Wraps an async operation and retries it while the returned error is
//! [`Error::is_retryable`].

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff delay for a given attempt, capped at `max_backoff`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt));
        std::cmp::min(delay, self.max_backoff)
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out
pub async fn with_retry<T, E, F, Fut>(operation: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    E: Into<Error>,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        let err: Error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e.into(),
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= policy.max_retries {
            if policy.max_retries == 0 {
                return Err(err);
            }
            return Err(Error::MaxRetriesExceeded {
                max_retries: policy.max_retries,
                message: format!("{operation}: {err}"),
            });
        }

        let delay = policy.calculate_backoff(attempt);
        warn!(
            "{} failed: {}, attempt {}/{}, retrying in {:?}",
            operation,
            err,
            attempt + 1,
            policy.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
