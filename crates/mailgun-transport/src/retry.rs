//! Capped exponential backoff for transient remote failures.
//!
//! Only [`TransportError::is_retryable`] errors are retried. Every attempt,
//! and every backoff sleep between attempts, races the caller's
//! cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Default cap on exponential backoff.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Delay used for 429 responses that carry no `Retry-After` hint.
pub const DEFAULT_RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(5);

/// Upper bound on a server-requested `Retry-After` wait.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

/// Retry policy for remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_backoff: Duration,
    /// Cap on the exponential delay.
    pub max_backoff: Duration,
    /// Delay applied to 429 responses without a `Retry-After` header.
    pub rate_limit_fallback: Duration,
    /// Cap on server-requested rate limit waits.
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            rate_limit_fallback: DEFAULT_RATE_LIMIT_FALLBACK,
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(1)
    }

    /// Sets the initial backoff.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the backoff cap.
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Sets the fallback delay for rate limiting without a hint.
    pub fn with_rate_limit_fallback(mut self, fallback: Duration) -> Self {
        self.rate_limit_fallback = fallback;
        self
    }

    /// Sets the cap on server-requested waits.
    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// Returns true if another attempt is allowed after `attempt` (0-based)
    /// failed with `error`.
    pub fn should_retry(&self, attempt: u32, error: &TransportError) -> bool {
        attempt + 1 < self.max_attempts.max(1) && error.is_retryable()
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32, error: &TransportError) -> Duration {
        if let TransportError::RateLimited { retry_after } = error {
            return (*retry_after).min(self.max_rate_limit_wait);
        }
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Runs `attempt_fn` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// The closure receives the 0-based attempt number and must build its
    /// request from scratch each time. On exhaustion the last error is
    /// returned unchanged. Cancellation yields [`TransportError::Cancelled`]
    /// and abandons any remaining attempts.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> TransportResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Cancelled),
                result = attempt_fn(attempt) => result,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "Request succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(attempt, &error) {
                if error.is_retryable() {
                    warn!(
                        operation,
                        attempts = attempt + 1,
                        error = %error,
                        "Retry budget exhausted"
                    );
                }
                return Err(error);
            }

            let delay = self.delay_for(attempt, &error);
            debug!(
                operation,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
