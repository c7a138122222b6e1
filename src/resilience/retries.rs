//! Retry loop driven through a circuit breaker.
//!
//! Every attempt goes through [`CircuitBreaker::execute`], so a dependency
//! that keeps failing trips the breaker and later attempts are rejected
//! cheaply until its reset timeout elapses. Rejections count as failed
//! attempts and are retried after the usual backoff.

use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tokio::time;

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;
use crate::resilience::circuit_breaker::{BreakerError, CircuitBreaker};

/// Returned when every attempt failed.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryError<E> {
    pub attempts: u32,
    /// Outcome of the final attempt.
    pub last: BreakerError<E>,
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Backoff::from_config(config))
    }
}

/// Call `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// `operation` receives the 1-based attempt number.
pub async fn retry_with_breaker<F, Fut, T, E>(
    breaker: &CircuitBreaker,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match breaker.execute(|| operation(attempt)).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(breaker = %breaker.name(), attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(
                    breaker = %breaker.name(),
                    attempts = attempt,
                    error = %e,
                    "Retries exhausted"
                );
                return Err(RetryError { attempts: attempt, last: e });
            }
            Err(e) => {
                let delay = policy.backoff.delay(attempt);
                tracing::warn!(
                    breaker = %breaker.name(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, backing off"
                );
                time::sleep(delay).await;
            }
        }
    }
}
