//! Bounded retry with a fixed inter-attempt delay.
//!
//! Every transport failure is retried until the attempt budget is spent. No
//! backoff growth, no jitter: the notification path talks to a single
//! downstream service and keeps its timing predictable.

use std::{future::Future, time::Duration};

use gista_core::Clock;

use crate::error::{NotifyError, Result, TransportError};

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry policy for outbound notification calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 act as 1.
    pub max_retries: u32,
    /// Pause between consecutive attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, retry_delay: DEFAULT_RETRY_DELAY }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and delay.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self { max_retries, retry_delay }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Upper bound on how long a call can block with the given per-attempt
    /// timeout.
    pub fn worst_case_duration(&self, timeout: Duration) -> Duration {
        let attempts = self.attempts();
        timeout.saturating_mul(attempts).saturating_add(self.retry_delay.saturating_mul(attempts - 1))
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Sleeps `retry_delay` on `clock` between attempts. `url` names the
    /// request in logs and in the terminal error.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::RetryExhausted` carrying the attempt count and
    /// the final attempt's failure.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, url: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let max_attempts = self.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, url, "Request succeeded after retry");
                    }
                    return Ok(value);
                },
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_retries = max_attempts,
                        url,
                        error = %error,
                        "Request failed"
                    );

                    if attempt >= max_attempts {
                        tracing::error!(attempts = attempt, url, "Giving up after final attempt");
                        return Err(NotifyError::retry_exhausted(url, attempt, error));
                    }

                    if !self.retry_delay.is_zero() {
                        clock.sleep(self.retry_delay).await;
                    }
                },
            }
        }
    }
}
