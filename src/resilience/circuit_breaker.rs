//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast (or go to a fallback)
//! - Half-Open: probation, calls pass through as trials
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: reset timeout elapsed since the last failure
//! Half-Open → Closed: 3 consecutive trial successes
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - One breaker per protected resource (see `registry.rs`), never global
//! - The breaker is a gate, not a retrier; see `retries.rs` for the loop
//! - A single success while Closed clears the failure count, so only
//!   consecutive failures trip the breaker
//! - No timeout is imposed on the wrapped operation; if it hangs, so does `execute`
//! - State lives behind a mutex that is never held across an `.await`

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Consecutive Half-Open successes required to close the breaker.
pub const HALF_OPEN_SUCCESS_QUOTA: u32 = 3;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not attempted.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The operation (or fallback) ran and failed.
    #[error("{0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True if the call was rejected without being attempted.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    /// The operation's own error, if it was attempted.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            BreakerError::Open { .. } => None,
        }
    }
}

/// Point-in-time view of a breaker's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerMetrics {
    pub name: String,
    pub state: CircuitState,
    /// Every call to `execute`, including rejected ones.
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Calls refused while open.
    pub rejections: u64,
    /// `total_successes / total_requests`, 0 when there was no traffic.
    pub success_rate: f64,
    /// Number of transitions into Open.
    pub trips: u64,
    /// Current consecutive failure count.
    pub failure_count: u32,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    total_requests: u64,
    total_successes: u64,
    total_failures: u64,
    rejections: u64,
    trips: u64,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            total_requests: 0,
            total_successes: 0,
            total_failures: 0,
            rejections: 0,
            trips: 0,
        }
    }
}

/// Circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(BreakerState::default()),
        }
    }

    /// Create a breaker from the `[breaker]` config section.
    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::new(
            name,
            config.failure_threshold,
            Duration::from_millis(config.reset_timeout_ms),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Run `operation` through the breaker.
    ///
    /// Returns [`BreakerError::Open`] without calling `operation` while the
    /// breaker is open and the reset timeout has not elapsed.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, None::<fn() -> std::future::Ready<Result<T, E>>>)
            .await
    }

    /// Run `operation` through the breaker, serving `fallback` instead when
    /// the breaker is open or when this failure trips it.
    ///
    /// A failing fallback surfaces as [`BreakerError::Inner`].
    pub async fn execute_with_fallback<F, Fut, G, GFut, T, E>(
        &self,
        operation: F,
        fallback: G,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        self.run(operation, Some(fallback)).await
    }

    async fn run<F, Fut, G, GFut, T, E>(
        &self,
        operation: F,
        fallback: Option<G>,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return match fallback {
                Some(fallback) => fallback().await.map_err(BreakerError::Inner),
                None => Err(BreakerError::Open {
                    name: self.name.clone(),
                }),
            };
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => match (self.on_failure(), fallback) {
                (CircuitState::Open, Some(fallback)) => {
                    fallback().await.map_err(BreakerError::Inner)
                }
                _ => Err(BreakerError::Inner(e)),
            },
        }
    }

    /// Count the request and decide whether the operation may run.
    fn admit(&self) -> bool {
        let mut inner = self.lock();
        inner.total_requests += 1;

        if inner.state != CircuitState::Open {
            return true;
        }
        if self.reset_elapsed(&inner) {
            self.enter_half_open(&mut inner);
            return true;
        }

        inner.rejections += 1;
        tracing::debug!(breaker = %self.name, "Circuit open, rejecting call");
        metrics::record_breaker_rejection(&self.name);
        false
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        inner.total_successes += 1;

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= HALF_OPEN_SUCCESS_QUOTA {
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            CircuitState::Closed => inner.failure_count = 0,
            // A call admitted before a concurrent trip; the trip stands.
            CircuitState::Open => {}
        }
    }

    /// Record a failure and return the resulting state.
    fn on_failure(&self) -> CircuitState {
        let mut inner = self.lock();
        inner.total_failures += 1;
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());

        let trip = match inner.state {
            CircuitState::Closed => inner.failure_count >= self.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            inner.trips += 1;
            self.transition(&mut inner, CircuitState::Open);
        }
        inner.state
    }

    /// Move an open breaker to Half-Open if its reset timeout has elapsed.
    ///
    /// `execute` performs the same check lazily; this lets a background
    /// monitor surface recovery eligibility without waiting for traffic.
    pub fn check_reset_timeout(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == CircuitState::Open && self.reset_elapsed(&inner) {
            self.enter_half_open(&mut inner);
            true
        } else {
            false
        }
    }

    /// Spawn a task that runs [`check_reset_timeout`](Self::check_reset_timeout)
    /// every `interval` until `shutdown` fires. A zero interval is raised to 1ms.
    pub fn spawn_monitor(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let breaker = Arc::clone(self);
        let interval = interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        breaker.check_reset_timeout();
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!(breaker = %breaker.name, "Breaker monitor stopping");
                        break;
                    }
                }
            }
        })
    }

    pub fn metrics(&self) -> BreakerMetrics {
        let inner = self.lock();
        let success_rate = if inner.total_requests == 0 {
            0.0
        } else {
            inner.total_successes as f64 / inner.total_requests as f64
        };

        BreakerMetrics {
            name: self.name.clone(),
            state: inner.state,
            total_requests: inner.total_requests,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            rejections: inner.rejections,
            success_rate,
            trips: inner.trips,
            failure_count: inner.failure_count,
        }
    }

    /// Force the breaker closed and zero every counter.
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = BreakerState::default();
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
        metrics::record_breaker_state(&self.name, CircuitState::Closed);
    }

    fn reset_elapsed(&self, inner: &BreakerState) -> bool {
        match inner.last_failure {
            Some(at) => at.elapsed() >= self.reset_timeout,
            None => true,
        }
    }

    fn enter_half_open(&self, inner: &mut BreakerState) {
        inner.success_count = 0;
        self.transition(inner, CircuitState::HalfOpen);
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        inner.state = to;

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = %from,
                failures = inner.failure_count,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state change"),
        }
        metrics::record_breaker_transition(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
