//! Retry classification and linear backoff for retrieval calls.

use std::future::Future;
use std::time::Duration;

use crate::config::DownloadConfig;
use crate::error::RetrievalError;

/// Default number of attempts per call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then try again.
    Retry { delay: Duration },
    /// The error is permanent.
    Permanent,
    /// The attempt budget is spent.
    Exhausted,
}

/// Outcome of a retried call together with how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: std::result::Result<T, RetrievalError>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    /// Attempts beyond the first.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry budget with `attempt * base_delay` backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_base_delay())
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Decides what follows failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn decide(&self, attempt: u32, error: &RetrievalError) -> RetryDecision {
        if error.is_permanent() {
            RetryDecision::Permanent
        } else if attempt >= self.max_attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry {
                delay: self.backoff(attempt),
            }
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `on_retry` is called with the failed attempt number and its error
    /// before each backoff sleep.
    pub async fn run<T, F, Fut, R>(&self, mut op: F, mut on_retry: R) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, RetrievalError>>,
        R: FnMut(u32, &RetrievalError),
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => match self.decide(attempt, &err) {
                    RetryDecision::Retry { delay } => {
                        log::debug!("Attempt {attempt} failed ({err}), retrying in {delay:?}");
                        on_retry(attempt, &err);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                    }
                    RetryDecision::Permanent | RetryDecision::Exhausted => {
                        return Attempted {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }
                },
            }
        }
    }
}
