//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the breaker registry and query cache from configuration
//! - Start their background tasks under the shutdown coordinator
//! - Probe the database through its breaker with retries and backoff
//!
//! # Design Decisions
//! - Fail fast: an unreachable database after all retries is fatal
//! - Shared components are constructed here and passed explicitly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::cache::TtlCache;
use crate::config::{AppConfig, DatabaseConfig};
use crate::lifecycle::Shutdown;
use crate::resilience::{retry_with_breaker, BreakerRegistry, CircuitBreaker, RetryError, RetryPolicy};

/// Breaker name used for the document database.
pub const DATABASE_BREAKER: &str = "database";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database unreachable at {address}: {source}")]
    Database {
        address: String,
        source: RetryError<std::io::Error>,
    },

    #[error("database connection to {address} unusable: {source}")]
    Connection {
        address: String,
        source: std::io::Error,
    },
}

/// Components shared with request handlers.
pub struct Services {
    pub breakers: Arc<BreakerRegistry>,
    pub query_cache: Arc<TtlCache<Value>>,
}

impl Services {
    /// Build the shared components and start their background tasks.
    pub fn start(config: &AppConfig, shutdown: &Shutdown) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(config.breaker.clone()));
        let query_cache = Arc::new(TtlCache::from_config("queries", &config.cache));

        shutdown.track("breaker-monitor", breakers.spawn_monitor(shutdown.subscribe()));
        shutdown.track(
            "cache-sweeper",
            query_cache.spawn_sweeper(
                Duration::from_millis(config.cache.sweep_interval_ms.max(1)),
                shutdown.subscribe(),
            ),
        );

        tracing::info!(
            failure_threshold = config.breaker.failure_threshold,
            reset_timeout_ms = config.breaker.reset_timeout_ms,
            cache_capacity = config.cache.max_entries,
            cache_ttl_ms = config.cache.default_ttl_ms,
            "Services started"
        );

        Self {
            breakers,
            query_cache,
        }
    }

    pub fn database_breaker(&self) -> Arc<CircuitBreaker> {
        self.breakers.get_or_create(DATABASE_BREAKER)
    }
}

/// Check that the database accepts TCP connections, retrying through `breaker`.
///
/// Returns the address that answered.
pub async fn probe_database(
    config: &DatabaseConfig,
    breaker: &CircuitBreaker,
    policy: &RetryPolicy,
) -> Result<SocketAddr, StartupError> {
    tracing::info!(address = %config.address, max_attempts = policy.max_attempts, "Connecting to database");

    let stream = retry_with_breaker(breaker, policy, |attempt| {
        tracing::debug!(attempt, address = %config.address, "Database connection attempt");
        TcpStream::connect(config.address.clone())
    })
    .await
    .map_err(|source| StartupError::Database {
        address: config.address.clone(),
        source,
    })?;

    let peer = stream.peer_addr().map_err(|source| StartupError::Connection {
        address: config.address.clone(),
        source,
    })?;

    tracing::info!(peer = %peer, "Database reachable");
    Ok(peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::backoff::Backoff;
    use crate::resilience::CircuitState;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_reaches_listening_database() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = DatabaseConfig { address: addr.to_string() };
        let breaker = CircuitBreaker::new(DATABASE_BREAKER, 3, Duration::from_secs(1));
        let policy = RetryPolicy::new(2, Backoff::new(10, 10));

        let peer = probe_database(&config, &breaker, &policy).await.unwrap();
        assert_eq!(peer, addr);
        assert_eq!(breaker.metrics().total_successes, 1);
    }

    #[tokio::test]
    async fn test_probe_gives_up_on_closed_port() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let config = DatabaseConfig { address: addr.to_string() };
        let breaker = CircuitBreaker::new(DATABASE_BREAKER, 2, Duration::from_secs(60));
        let policy = RetryPolicy::new(3, Backoff::new(5, 10));

        let err = probe_database(&config, &breaker, &policy).await.unwrap_err();
        match err {
            StartupError::Database { source, .. } => {
                assert_eq!(source.attempts, 3);
                assert!(source.last.is_open());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_services_start_and_stop() {
        let shutdown = Shutdown::new();
        let services = Services::start(&AppConfig::default(), &shutdown);
        assert_eq!(shutdown.task_count(), 2);

        let db = services.database_breaker();
        assert!(Arc::ptr_eq(&db, &services.database_breaker()));
        services.query_cache.set("items:id:1", serde_json::json!({"sku": "A-1"}));
        assert_eq!(services.query_cache.len(), 1);

        assert_eq!(shutdown.complete(Duration::from_secs(1)).await, 2);
    }
}
