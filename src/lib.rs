//! Resilience core for the inventory backend.
//!
//! - [`resilience`]: circuit breakers guarding external dependencies, with
//!   retry/backoff composed on top
//! - [`cache`]: bounded TTL cache for query results
//! - [`config`], [`observability`], [`lifecycle`]: configuration, logging and
//!   metrics, startup and shutdown

pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cache::TtlCache;
pub use config::AppConfig;
pub use lifecycle::Shutdown;
pub use resilience::{BreakerError, CircuitBreaker, CircuitState};
