//! Bounded retry with a fixed delay between attempts
//!
//! Each attempt reports an explicit [`AttemptError`] class instead of relying
//! on control flow through errors: only `Retryable` failures are tried again,
//! `Rejected` ends the unit of work, `Fatal` ends the whole invocation.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::rate_limit::RollingWindowLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between the end of a failed attempt and the next one
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

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Outcome class of a single failed attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    /// Transient; worth another attempt
    #[error("{0}")]
    Retryable(String),
    /// Permanent for this unit of work; do not retry
    #[error("{0}")]
    Rejected(String),
    /// Nothing else can succeed either (bad credentials, ...)
    #[error("{0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("rejected on attempt {attempts}: {reason}")]
    Rejected { attempts: u32, reason: String },
    #[error("fatal error on attempt {attempts}: {reason}")]
    Fatal { attempts: u32, reason: String },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Rejected { attempts, .. }
            | RetryError::Fatal { attempts, .. } => *attempts,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::Fatal { .. })
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Retryable(reason)) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: reason,
                    });
                }
                warn!(
                    "Attempt {}/{} failed: {}, retrying in {:?}",
                    attempt, max_attempts, reason, policy.delay
                );
                sleep(policy.delay).await;
            }
            Err(AttemptError::Rejected(reason)) => {
                return Err(RetryError::Rejected {
                    attempts: attempt,
                    reason,
                })
            }
            Err(AttemptError::Fatal(reason)) => {
                return Err(RetryError::Fatal {
                    attempts: attempt,
                    reason,
                })
            }
        }
    }
}

/// [`retry`] with every attempt gated by `limiter`.
///
/// Time spent waiting for a permit is added on top of `policy.delay` and is
/// never counted as an attempt.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limiter: &RollingWindowLimiter,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    retry(policy, |attempt| {
        let attempt_fut = op(attempt);
        async move {
            let waited = limiter.acquire().await;
            if !waited.is_zero() {
                debug!("Attempt {} waited {:?} for a rate limit permit", attempt, waited);
            }
            attempt_fut.await
        }
    })
    .await
}
