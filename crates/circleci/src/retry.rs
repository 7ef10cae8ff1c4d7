//! Fixed-delay retry for the pipeline-trigger call.
//!
//! The policy is deliberately flat: up to [`RetryConfig::max_retries`] further
//! attempts, each preceded by the same [`RetryConfig::delay`]. No exponential
//! growth, no jitter. Which failures are retried is decided by a predicate
//! passed in by the caller, so the loop itself can be exercised without a
//! network.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry bounds for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries (not including the initial attempt).
    pub max_retries: u32,

    /// Delay before every retry.
    pub delay: Duration,
}

impl RetryConfig {
    /// 10 retries, 30 seconds apart.
    pub const DEFAULT: Self = Self {
        max_retries: 10,
        delay: Duration::from_secs(30),
    };

    /// Creates a new retry configuration.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Maximum number of attempts, including the initial one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success {
        /// The operation's result.
        value: T,
        /// Number of attempts made (including the successful one).
        attempts: u32,
    },

    /// Every attempt failed with a retryable error.
    Exhausted {
        /// The last error encountered.
        last_error: E,
        /// Number of attempts made.
        attempts: u32,
    },

    /// An attempt failed with an error the predicate refused to retry.
    Rejected {
        /// The error that stopped the loop.
        error: E,
        /// Number of attempts made (including the rejected one).
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts made, whatever the outcome.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Rejected { attempts, .. } => *attempts,
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or `config.max_attempts()` is reached.
///
/// `operation` receives the 1-based attempt number.
pub async fn retry_with_fixed_delay<T, E, F, Fut, P>(
    config: RetryConfig,
    should_retry: P,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = config.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(error) if !should_retry(&error) => {
                return RetryOutcome::Rejected {
                    error,
                    attempts: attempt,
                }
            }
            Err(error) if attempt >= max_attempts => {
                return RetryOutcome::Exhausted {
                    last_error: error,
                    attempts: attempt,
                }
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = config.delay.as_secs_f64(),
                    error = %error,
                    "Attempt failed; retrying after fixed delay"
                );
                tokio::time::sleep(config.delay).await;
            }
        }
    }
}
