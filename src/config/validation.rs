//! Configuration validation.
//!
//! Serde handles the syntax; this module checks value ranges and addresses.
//! All violations are reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// Backoff base delay larger than the cap.
    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    /// An address field could not be parsed as `host:port`.
    #[error("{field} is not a valid socket address: {value}")]
    Address { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("breaker.failure_threshold", config.breaker.failure_threshold as u64),
        ("breaker.reset_timeout_ms", config.breaker.reset_timeout_ms),
        ("breaker.monitor_interval_ms", config.breaker.monitor_interval_ms),
        ("cache.max_entries", config.cache.max_entries as u64),
        ("cache.default_ttl_ms", config.cache.default_ttl_ms),
        ("cache.sweep_interval_ms", config.cache.sweep_interval_ms),
        ("retries.max_attempts", config.retries.max_attempts as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    // Hostnames are resolved at connect time, so only reject missing ports.
    if !has_port(&config.database.address) {
        errors.push(ValidationError::Address {
            field: "database.address",
            value: config.database.address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_violation() {
        let mut config = AppConfig::default();
        config.breaker.failure_threshold = 0;
        config.cache.max_entries = 0;
        config.retries.base_delay_ms = 5_000;
        config.retries.max_delay_ms = 100;
        config.database.address = "localhost".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("breaker.failure_threshold")));
        assert!(errors.contains(&ValidationError::Zero("cache.max_entries")));
        assert!(errors.contains(&ValidationError::BackoffRange { base: 5_000, max: 100 }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "not-an-address".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_hostname_database_address_accepted() {
        let mut config = AppConfig::default();
        config.database.address = "mongo.internal:27017".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
