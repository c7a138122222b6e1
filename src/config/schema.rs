//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Circuit breaker settings shared by every protected resource.
    pub breaker: BreakerConfig,

    /// Query cache settings.
    pub cache: CacheConfig,

    /// Retry policy for the connection bootstrap.
    pub retries: RetryConfig,

    /// Database endpoint probed at startup.
    pub database: DatabaseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,

    /// How long the breaker stays open before allowing a trial call, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Interval of the background reset-timeout check, in milliseconds.
    pub monitor_interval_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            monitor_interval_ms: 5_000,
        }
    }
}

/// TTL cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Hard cap on the number of entries.
    pub max_entries: usize,

    /// TTL applied by `set` when none is given, in milliseconds.
    pub default_ttl_ms: u64,

    /// Interval of the expired-entry sweep, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            default_ttl_ms: 300_000, // 5 minutes
            sweep_interval_ms: 60_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

/// Database endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Address of the document database (e.g., "127.0.0.1:27017").
    pub address: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:27017".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [breaker]
            failure_threshold = 3

            [cache]
            max_entries = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.reset_timeout_ms, 30_000);
        assert_eq!(config.cache.max_entries, 2);
        assert_eq!(config.cache.default_ttl_ms, 300_000);
        assert_eq!(config.database.address, "127.0.0.1:27017");
        assert!(!config.observability.metrics_enabled);
    }
}
