//! Bounded retry for transient upstream failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::SourceError;

/// Pause between attempts after a rate-limit or network failure.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 2;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff: RATE_LIMIT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// or the retries are used up. The last error is returned.
    ///
    /// At most `1 + max_retries` calls are made.
    pub async fn run<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut retries = 0;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        what,
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "upstream request failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
