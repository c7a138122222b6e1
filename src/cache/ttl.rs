//! Bounded TTL cache with FIFO eviction.
//!
//! Entries expire `ttl` after they were last set. Expired entries are purged
//! lazily by `get` and periodically by the sweeper task. When the cache is
//! full, inserting a new key evicts the oldest inserted entry still present;
//! overwriting a key keeps its original position.
//!
//! The cache is advisory: nothing here returns an error, and callers must
//! behave correctly if every lookup misses.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::CacheConfig;
use crate::observability::metrics;

/// Expiry used when `now + ttl` overflows the clock (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Shortest sweep interval; `time::interval` rejects zero.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Cache effectiveness counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 when there were no lookups.
    pub hit_rate: f64,
    pub size: usize,
    pub capacity: usize,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries purged after their TTL passed.
    pub expirations: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    /// Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn remove_where(&mut self, mut pred: impl FnMut(&str, &Entry<V>) -> bool) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, e)| pred(k.as_str(), *e))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }
}

/// In-memory key-value cache with per-entry expiry.
#[derive(Debug)]
pub struct TtlCache<V> {
    name: String,
    max_entries: usize,
    default_ttl: Duration,
    state: Mutex<CacheState<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: impl Into<String>, max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            max_entries,
            default_ttl,
            state: Mutex::new(CacheState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self::new(
            name,
            config.max_entries,
            Duration::from_millis(config.default_ttl_ms),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `value` under `key` with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }
        let key = key.into();
        let now = Instant::now();
        // Durations past the clock's range never expire in practice.
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE);
        let mut state = self.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }

        if state.entries.len() >= self.max_entries {
            if let Some((_, oldest)) = state.order.pop_first() {
                state.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_eviction(&self.name, "capacity", 1);
                tracing::debug!(cache = %self.name, key = %oldest, "Evicted oldest entry");
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.insert(seq, key.clone());
        state.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                seq,
            },
        );
        metrics::record_cache_size(&self.name, state.entries.len());
    }

    /// Value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.lock();

        let lookup = state
            .entries
            .get(key)
            .map(|entry| (now <= entry.expires_at).then(|| entry.value.clone()));
        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                state.remove(key);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_eviction(&self.name, "expired", 1);
                None
            }
            None => None,
        };
        drop(state);

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(&self.name, found.is_some());
        found
    }

    /// Return the cached value or run `load`, caching its success with the default TTL.
    ///
    /// Errors from `load` are returned untouched and nothing is cached.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = load().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.lock();
        let removed = state.remove(key).is_some();
        if removed {
            metrics::record_cache_size(&self.name, state.entries.len());
        }
        removed
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.lock();
        let removed = state.remove_where(|key, _| key.starts_with(prefix));
        metrics::record_cache_eviction(&self.name, "invalidated", removed);
        metrics::record_cache_size(&self.name, state.entries.len());
        if removed > 0 {
            tracing::debug!(cache = %self.name, prefix, removed, "Invalidated cache prefix");
        }
        removed
    }

    /// Remove all entries. Counters are left alone.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        metrics::record_cache_size(&self.name, 0);
        tracing::debug!(cache = %self.name, "Cache cleared");
    }

    /// Purge entries whose expiry has passed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let removed = state.remove_where(|_, entry| entry.expires_at < now);
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            metrics::record_cache_eviction(&self.name, "expired", removed);
            tracing::debug!(cache = %self.name, removed, "Swept expired entries");
        }
        metrics::record_cache_size(&self.name, state.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
            capacity: self.max_entries,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Zero the hit, miss, eviction and expiration counters.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Spawn a task that calls [`sweep_expired`](Self::sweep_expired) every
    /// `interval` until `shutdown` fires.
    ///
    /// A panicking sweep is logged and the task keeps running.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let interval = interval.max(MIN_TICK);
        tokio::spawn(async move {
            tracing::info!(
                cache = %cache.name,
                interval_ms = interval.as_millis() as u64,
                "Cache sweeper starting"
            );
            let mut ticker = time::interval(interval);
            // The first tick completes immediately; nothing can have expired yet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if panic::catch_unwind(AssertUnwindSafe(|| cache.sweep_expired())).is_err() {
                            tracing::error!(cache = %cache.name, "Cache sweep panicked; continuing");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!(cache = %cache.name, "Cache sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}
