//! Named breakers, one per protected resource.
//!
//! # Responsibilities
//! - Create breakers lazily from the shared `[breaker]` settings
//! - Hand out the same breaker for the same resource name
//! - Snapshot metrics for every breaker
//! - Run the periodic reset-timeout check for all breakers in one task

use std::sync::Arc;
use std::time::Duration;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{BreakerMetrics, CircuitBreaker, CircuitState};

#[derive(Debug)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `name`, created on first use.
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(breaker = %name, "Registering circuit breaker");
                metrics::record_breaker_state(name, CircuitState::Closed);
                Arc::new(CircuitBreaker::from_config(name, &self.config))
            })
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Metrics for every registered breaker, sorted by name.
    pub fn snapshot(&self) -> Vec<BreakerMetrics> {
        let mut all: Vec<_> = self.breakers.iter().map(|r| r.value().metrics()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn reset_all(&self) {
        for r in self.breakers.iter() {
            r.value().reset();
        }
    }

    /// Check every breaker's reset timeout on the configured interval until
    /// `shutdown` fires.
    pub fn spawn_monitor(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = Duration::from_millis(self.config.monitor_interval_ms.max(1));

        tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Breaker monitor starting");
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Collect first so no shard lock is held while breakers log.
                        let breakers: Vec<_> = registry.breakers.iter().map(|r| r.value().clone()).collect();
                        for breaker in breakers {
                            breaker.check_reset_timeout();
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Breaker monitor received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}
