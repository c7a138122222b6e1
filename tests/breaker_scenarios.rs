//! End-to-end circuit breaker behavior.

use std::time::Duration;
use inventory_resilience::resilience::{BreakerError, CircuitBreaker, CircuitState};
use tokio::time;

mod common;
use common::ScriptedDependency;

#[tokio::test(start_paused = true)]
async fn test_trip_reject_recover() {
    let breaker = CircuitBreaker::new("database", 3, Duration::from_millis(1000));
    let failing = ScriptedDependency::always(false);

    for _ in 0..3 {
        let res = breaker.execute(|| failing.call()).await;
        assert!(matches!(res, Err(BreakerError::Inner(_))));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let res = breaker.execute(|| failing.call()).await;
    assert!(res.unwrap_err().is_open());
    assert_eq!(failing.calls(), 3, "rejected call must not reach the dependency");

    time::advance(Duration::from_millis(1000)).await;

    let healthy = ScriptedDependency::always(true);
    for i in 0..3 {
        breaker.execute(|| healthy.call()).await.unwrap();
        let expected = if i < 2 { CircuitState::HalfOpen } else { CircuitState::Closed };
        assert_eq!(breaker.state(), expected);
    }
    assert_eq!(healthy.calls(), 3);

    let m = breaker.metrics();
    assert_eq!(m.failure_count, 0);
    assert_eq!(m.trips, 1);
    assert_eq!(m.rejections, 1);
    assert_eq!(m.total_requests, 7);
}

#[tokio::test]
async fn test_fewer_failures_than_threshold_always_pass_through() {
    let breaker = CircuitBreaker::new("database", 3, Duration::from_secs(30));
    // Never three failures in a row.
    let dep = ScriptedDependency::new(&[false, false, true, false, false, true, false, true]);

    for _ in 0..8 {
        let _ = breaker.execute(|| dep.call()).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
    assert_eq!(dep.calls(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_trial_failure_reopens_and_waits_again() {
    let breaker = CircuitBreaker::new("object-storage", 1, Duration::from_millis(500));
    let dep = ScriptedDependency::new(&[false, false, true]);

    let _ = breaker.execute(|| dep.call()).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    time::advance(Duration::from_millis(500)).await;
    let _ = breaker.execute(|| dep.call()).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(dep.calls(), 2, "exactly one trial call");

    time::advance(Duration::from_millis(499)).await;
    assert!(breaker.execute(|| dep.call()).await.unwrap_err().is_open());

    time::advance(Duration::from_millis(1)).await;
    assert!(breaker.execute(|| dep.call()).await.is_ok());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_serves_stale_data_while_open() {
    let breaker = CircuitBreaker::new("database", 2, Duration::from_secs(5));
    let dep = ScriptedDependency::always(false);
    let fallback = || async { Ok::<u32, String>(0) };

    let first = breaker.execute_with_fallback(|| dep.call(), fallback).await;
    assert!(matches!(first, Err(BreakerError::Inner(_))));

    let second = breaker.execute_with_fallback(|| dep.call(), fallback).await;
    assert_eq!(second.unwrap(), 0);

    let third = breaker.execute_with_fallback(|| dep.call(), fallback).await;
    assert_eq!(third.unwrap(), 0);
    assert_eq!(dep.calls(), 2);
}
