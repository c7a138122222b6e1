//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_state` (gauge): 0=closed, 1=open, 2=half-open, by breaker
//! - `breaker_transitions_total` (counter): state changes, by breaker and target state
//! - `breaker_rejections_total` (counter): calls refused while open
//! - `cache_lookups_total` (counter): by cache and result (hit/miss)
//! - `cache_evictions_total` (counter): by cache and reason (capacity/expired/invalidated)
//! - `cache_entries` (gauge): current size
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_state(name: &str, state: CircuitState) {
    gauge!("breaker_state", "breaker" => name.to_string()).set(state as u8 as f64);
}

pub fn record_breaker_transition(name: &str, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "breaker" => name.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_breaker_state(name, to);
}

pub fn record_breaker_rejection(name: &str) {
    counter!("breaker_rejections_total", "breaker" => name.to_string()).increment(1);
}

pub fn record_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("cache_lookups_total", "cache" => cache.to_string(), "result" => result).increment(1);
}

pub fn record_cache_eviction(cache: &str, reason: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    counter!("cache_evictions_total", "cache" => cache.to_string(), "reason" => reason)
        .increment(count as u64);
}

pub fn record_cache_size(cache: &str, size: usize) {
    gauge!("cache_entries", "cache" => cache.to_string()).set(size as f64);
}
