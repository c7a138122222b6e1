//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → registry.rs (breaker for the named resource)
//!     → retries.rs (attempt loop with backoff.rs delays)
//!     → circuit_breaker.rs (track failures, open circuit if threshold exceeded)
//! ```
//!
//! # Design Decisions
//! - Circuit breaker prevents hammering a failing dependency
//! - Breakers never retry; retry policy is composed on top
//! - Jittered backoff prevents thundering herd on reconnect

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;
pub mod retries;

pub use circuit_breaker::{BreakerError, BreakerMetrics, CircuitBreaker, CircuitState};
pub use registry::BreakerRegistry;
pub use retries::{retry_with_breaker, RetryError, RetryPolicy};
