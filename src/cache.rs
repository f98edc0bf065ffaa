//! A single named, bounded cache.

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{Error, Result};
use crate::policy::EvictionPolicy;
use crate::stats::{CacheStats, StatsCounters};
use crate::strategy::EvictionStrategy;
use crate::value::CacheValue;
use parking_lot::Mutex;
use regex::Regex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

type FlightGate = Arc<AsyncMutex<()>>;

/// One named key → value store bound to an eviction policy and a TTL.
///
/// All mutation happens under the cache's own lock, held for exactly one
/// logical operation and never across an `.await`. After every `set` the
/// cache holds at most `max_size` entries.
///
/// # Example
///
/// ```
/// use cache_registry::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// let cache: Cache<String> =
///     Cache::new("kpi-data", CacheConfig::lru(Duration::from_secs(300), 1000)).unwrap();
///
/// cache.set("portfolio:1:irr", "12.5%".to_string(), None).unwrap();
/// assert_eq!(cache.get("portfolio:1:irr").as_deref(), Some("12.5%"));
/// ```
pub struct Cache<T> {
    name: String,
    config: CacheConfig,
    policy: EvictionPolicy,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    counters: StatsCounters,
    global: Arc<StatsCounters>,
    single_flight: bool,
    in_flight: Mutex<HashMap<String, FlightGate>>,
}

impl<T: CacheValue> Cache<T> {
    /// Create a standalone cache.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if `config` is invalid (e.g. `max_size == 0`).
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Result<Self> {
        Self::with_counters(name, config, Arc::new(StatsCounters::new()), false)
    }

    /// Create a cache that also reports into shared (registry) counters.
    pub(crate) fn with_counters(
        name: impl Into<String>,
        config: CacheConfig,
        global: Arc<StatsCounters>,
        single_flight: bool,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Cache {
            name: name.into(),
            policy: EvictionPolicy::new(config.strategy),
            config,
            entries: Mutex::new(HashMap::new()),
            counters: StatsCounters::new(),
            global,
            single_flight,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Coalesce concurrent misses for the same key in [`get_or_fetch`](Self::get_or_fetch).
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_single_flight(&self) -> bool {
        self.single_flight
    }

    /// Number of stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the keys holding live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| !EvictionPolicy::is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Insert or overwrite `key`.
    ///
    /// A full cache first evicts a batch of entries chosen by its policy, so
    /// capacity never causes a failure.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` if `ttl_override` is zero.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: T,
        ttl_override: Option<Duration>,
    ) -> Result<()> {
        let ttl = match ttl_override {
            Some(ttl) if ttl.is_zero() => {
                return Err(Error::ValidationError(
                    "ttl override must be non-zero".to_string(),
                ))
            }
            Some(ttl) => ttl,
            None => self.config.ttl,
        };

        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(max_size) = self.config.max_size {
            if entries.len() >= max_size && !entries.contains_key(&key) {
                self.make_room(&mut entries, max_size, now);
            }
        }

        entries.insert(key.clone(), CacheEntry::new(value, ttl, now));
        drop(entries);

        self.counters.record_set();
        self.global.record_set();
        debug!("✓ Cache SET {}:{} (TTL: {:?})", self.name, key, ttl);
        Ok(())
    }

    /// Clone of the value under `key`, or `None` if absent or expired.
    ///
    /// An expired entry is removed by this read.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lookup(key, true)
    }

    /// Whether `key` holds a live entry. Does not count as a hit or miss,
    /// but removes the entry if it has expired.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) => EvictionPolicy::is_expired(entry, now),
            None => return false,
        };
        if !expired {
            return true;
        }

        entries.remove(key);
        drop(entries);
        self.record_evictions(1);
        false
    }

    /// Remove `key`; returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            self.counters.record_deletes(1);
            self.global.record_deletes(1);
            debug!("✓ Cache DELETE {}:{}", self.name, key);
        }
        removed
    }

    /// Remove every entry; returns how many there were.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let count = entries.len();
            entries.clear();
            count
        };
        if removed > 0 {
            self.counters.record_deletes(removed);
            self.global.record_deletes(removed);
            info!("Cleared {} entries from cache {}", removed, self.name);
        }
        removed
    }

    /// Cached value if live, otherwise `fetcher`'s result, stored on success.
    ///
    /// `fetcher` runs at most once. On failure its error is returned
    /// unchanged and the cache is left as it was.
    pub fn get_or_set<E, F>(
        &self,
        key: &str,
        ttl_override: Option<Duration>,
        fetcher: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetcher()?;
        self.store_fetched(key, &value, ttl_override);
        Ok(value)
    }

    /// Async form of [`get_or_set`](Self::get_or_set).
    ///
    /// In single-flight mode concurrent misses for the same key wait for the
    /// first caller's fetch and then read its stored result. If that fetch
    /// fails, the next waiter fetches for itself. No timeout is applied to
    /// `fetcher`.
    ///
    /// Only a caller that runs `fetcher` counts as a miss; callers served by
    /// another caller's fetch count as hits.
    pub async fn get_or_fetch<E, F, Fut>(
        &self,
        key: &str,
        ttl_override: Option<Duration>,
        fetcher: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if !self.single_flight {
            if let Some(value) = self.get(key) {
                return Ok(value);
            }
            let value = fetcher().await?;
            self.store_fetched(key, &value, ttl_override);
            return Ok(value);
        }

        if let Some(value) = self.lookup(key, false) {
            self.record_hit();
            return Ok(value);
        }

        let _flight = self.join_flight(key).await;

        // The previous holder of the gate may have stored the value already
        if let Some(value) = self.lookup(key, false) {
            self.record_hit();
            debug!("✓ Single-flight {}:{} served by concurrent fetch", self.name, key);
            return Ok(value);
        }

        self.record_miss();
        debug!("✗ Cache GET {}:{} -> MISS (fetching)", self.name, key);
        let value = fetcher().await?;
        self.store_fetched(key, &value, ttl_override);
        Ok(value)
    }

    /// Fluent get-or-fetch with TTL override and retries.
    pub fn fetch<'a>(&'a self, key: &'a str) -> crate::builder::FetchBuilder<'a, T> {
        crate::builder::FetchBuilder::new(self, key)
    }

    /// Remove every key matching `pattern` (unanchored regex search).
    ///
    /// An empty or invalid pattern removes nothing.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        match Regex::new(pattern) {
            Ok(re) => self.invalidate_matching(&re),
            Err(e) => {
                warn!(
                    "⚠ Ignoring invalid invalidation pattern {:?} for cache {}: {}",
                    pattern, self.name, e
                );
                0
            }
        }
    }

    /// Remove every key matched by `re`.
    pub fn invalidate_matching(&self, re: &Regex) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|key, _| !re.is_match(key));
            before - entries.len()
        };
        if removed > 0 {
            self.counters.record_deletes(removed);
            self.global.record_deletes(removed);
            debug!(
                "✓ Cache INVALIDATE {} /{}/ removed {} entries",
                self.name,
                re.as_str(),
                removed
            );
        }
        removed
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| !EvictionPolicy::is_expired(entry, now));
            before - entries.len()
        };
        if removed > 0 {
            self.record_evictions(removed);
            debug!("✓ Purged {} expired entries from {}", removed, self.name);
        }
        removed
    }

    /// Snapshot of this cache's configuration, counters and contents.
    ///
    /// Values are cloned out under the lock; size estimation runs after it
    /// is released.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (values, ages): (Vec<T>, Vec<Duration>) = self
            .entries
            .lock()
            .values()
            .map(|entry| (entry.value.clone(), entry.age(now)))
            .unzip();

        let mut memory_bytes = 0;
        let mut unsized_entries = 0;
        for value in &values {
            match value.estimated_size() {
                Some(size) => memory_bytes += size,
                None => unsized_entries += 1,
            }
        }
        let oldest = ages.iter().max().copied();
        let newest = ages.iter().min().copied();

        CacheStats {
            name: self.name.clone(),
            entries: values.len(),
            max_size: self.config.max_size,
            ttl_secs: self.config.ttl.as_secs(),
            strategy: self.config.strategy,
            counters: self.counters.snapshot(),
            memory_bytes,
            unsized_entries,
            oldest_entry_age_ms: oldest.map(|d| d.as_millis() as u64),
            newest_entry_age_ms: newest.map(|d| d.as_millis() as u64),
        }
    }

    fn lookup(&self, key: &str, track: bool) -> Option<T> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = entries.get(key).map(|entry| EvictionPolicy::is_expired(entry, now));
        let Some(expired) = expired else {
            drop(entries);
            if track {
                self.record_miss();
                debug!("✗ Cache GET {}:{} -> MISS", self.name, key);
            }
            return None;
        };

        if expired {
            entries.remove(key);
            drop(entries);
            self.record_evictions(1);
            if track {
                self.record_miss();
                debug!("✗ Cache GET {}:{} -> EXPIRED", self.name, key);
            }
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        drop(entries);

        if track {
            self.record_hit();
            debug!("✓ Cache GET {}:{} -> HIT", self.name, key);
        }
        Some(value)
    }

    /// Evict until a new key fits. Caller holds the entry lock.
    fn make_room(
        &self,
        entries: &mut HashMap<String, CacheEntry<T>>,
        max_size: usize,
        now: Instant,
    ) {
        let count = EvictionPolicy::eviction_count(max_size);
        let victims = self.policy.select_victims(entries, count, now);
        let mut evicted = remove_keys(entries, victims);

        // TtlSweep never evicts live entries by count; if nothing had
        // expired, fall back to oldest-inserted so capacity still holds.
        if entries.len() >= max_size {
            let fallback = EvictionPolicy::new(EvictionStrategy::Fifo);
            let victims = fallback.select_victims(entries, count, now);
            evicted += remove_keys(entries, victims);
        }

        if evicted > 0 {
            self.record_evictions(evicted);
            debug!(
                "✓ Evicted {} entries from {} ({} policy, capacity {})",
                evicted, self.name, self.config.strategy, max_size
            );
        }
    }

    fn store_fetched(&self, key: &str, value: &T, ttl_override: Option<Duration>) {
        if let Err(e) = self.set(key, value.clone(), ttl_override) {
            warn!("⚠ Fetched value for {}:{} not cached: {}", self.name, key, e);
        }
    }

    async fn join_flight(&self, key: &str) -> FlightGuard<'_> {
        let gate = {
            let mut flights = self.in_flight.lock();
            Arc::clone(flights.entry(key.to_string()).or_default())
        };
        let permit = Arc::clone(&gate).lock_owned().await;
        FlightGuard {
            flights: &self.in_flight,
            key: key.to_string(),
            gate,
            permit: Some(permit),
        }
    }

    fn record_hit(&self) {
        self.counters.record_hit();
        self.global.record_hit();
    }

    fn record_miss(&self) {
        self.counters.record_miss();
        self.global.record_miss();
    }

    fn record_evictions(&self, count: usize) {
        self.counters.record_evictions(count);
        self.global.record_evictions(count);
    }
}

fn remove_keys<T>(entries: &mut HashMap<String, CacheEntry<T>>, keys: Vec<String>) -> usize {
    keys.iter()
        .filter(|key| entries.remove(key.as_str()).is_some())
        .count()
}

/// Held by the caller currently fetching a key in single-flight mode.
///
/// Dropping it (on success, error or cancellation) releases the gate and
/// removes it from the table once no other caller is waiting on it.
struct FlightGuard<'a> {
    flights: &'a Mutex<HashMap<String, FlightGate>>,
    key: String,
    gate: FlightGate,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        let mut flights = self.flights.lock();
        // One reference in the table, one here: nobody else is waiting
        if Arc::strong_count(&self.gate) <= 2 {
            flights.remove(&self.key);
        }
    }
}

/// Type-erased view of a [`Cache`], used by the registry for sweeps, stats
/// and bulk operations across caches of different value types.
pub trait ManagedCache: Send + Sync {
    fn name(&self) -> &str;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn purge_expired(&self) -> usize;
    fn clear(&self) -> usize;
    fn delete(&self, key: &str) -> bool;
    fn has(&self, key: &str) -> bool;
    fn invalidate_pattern(&self, pattern: &str) -> usize;
    fn stats(&self) -> CacheStats;
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: CacheValue> ManagedCache for Cache<T> {
    fn name(&self) -> &str {
        Cache::name(self)
    }

    fn len(&self) -> usize {
        Cache::len(self)
    }

    fn purge_expired(&self) -> usize {
        Cache::purge_expired(self)
    }

    fn clear(&self) -> usize {
        Cache::clear(self)
    }

    fn delete(&self, key: &str) -> bool {
        Cache::delete(self, key)
    }

    fn has(&self, key: &str) -> bool {
        Cache::has(self, key)
    }

    fn invalidate_pattern(&self, pattern: &str) -> usize {
        Cache::invalidate_pattern(self, pattern)
    }

    fn stats(&self) -> CacheStats {
        Cache::stats(self)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
