//! Failure injection for the database bootstrap.

use std::time::Duration;
use inventory_resilience::config::DatabaseConfig;
use inventory_resilience::lifecycle::{probe_database, StartupError};
use inventory_resilience::resilience::backoff::Backoff;
use inventory_resilience::resilience::{
    retry_with_breaker, BreakerRegistry, CircuitBreaker, CircuitState, RetryPolicy,
};
use inventory_resilience::config::BreakerConfig;

mod common;
use common::ScriptedDependency;

#[tokio::test]
async fn test_database_comes_up_during_retries() {
    let addr = common::unused_addr().await;
    common::start_mock_database_after(addr, Duration::from_millis(150));

    let config = DatabaseConfig { address: addr.to_string() };
    let breaker = CircuitBreaker::new("database", 10, Duration::from_secs(1));
    let policy = RetryPolicy::new(8, Backoff::new(50, 200));

    let peer = probe_database(&config, &breaker, &policy).await.expect("database should come up");
    assert_eq!(peer, addr);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.metrics().total_failures >= 1);
}

#[tokio::test]
async fn test_database_never_comes_up() {
    let addr = common::unused_addr().await;
    let config = DatabaseConfig { address: addr.to_string() };
    let breaker = CircuitBreaker::new("database", 10, Duration::from_secs(1));
    let policy = RetryPolicy::new(3, Backoff::new(10, 20));

    let err = probe_database(&config, &breaker, &policy).await.unwrap_err();
    assert!(matches!(err, StartupError::Database { .. }));
    assert!(err.to_string().contains(&addr.to_string()));
    assert_eq!(breaker.metrics().total_failures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_retries_ride_out_breaker_reset_timeout() {
    let registry = BreakerRegistry::new(BreakerConfig {
        failure_threshold: 2,
        reset_timeout_ms: 1_000,
        monitor_interval_ms: 100,
    });
    let breaker = registry.get_or_create("database");
    let dep = ScriptedDependency::new(&[false, false, true]);

    // Backoff grows past the reset timeout, so a later attempt becomes the trial.
    let policy = RetryPolicy::new(6, Backoff::new(400, 2_000));
    let value = retry_with_breaker(&breaker, &policy, |_| dep.call()).await.unwrap();

    assert_eq!(value, 2);
    assert_eq!(dep.calls(), 3);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.metrics().rejections >= 1);
}
