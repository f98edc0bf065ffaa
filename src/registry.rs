//! Process-wide table of named caches.

use crate::cache::{Cache, ManagedCache};
use crate::config::{CacheConfig, RegistryConfig};
use crate::error::{Error, FetchError, Result};
use crate::health::HealthReport;
use crate::stats::{RegistryStats, StatsCounters};
use crate::value::CacheValue;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Registry of named caches with global statistics and a background
/// cleanup sweep.
///
/// Constructed explicitly by the application and shared through `Arc`;
/// tests build their own isolated registries.
///
/// # Example
///
/// ```
/// use cache_registry::{CacheRegistry, RegistryConfig};
///
/// let registry = CacheRegistry::new(RegistryConfig::default()).unwrap();
/// registry.create_configured::<String>("kpi-data").unwrap();
///
/// let value = registry
///     .get_or_set("kpi-data", "portfolio:1:irr", None, || Ok::<_, ()>("12.5%".to_string()))
///     .unwrap();
/// assert_eq!(value, "12.5%");
/// ```
pub struct CacheRegistry {
    config: RegistryConfig,
    caches: DashMap<String, Arc<dyn ManagedCache>>,
    global: Arc<StatsCounters>,
}

impl Default for CacheRegistry {
    /// Registry with the built-in cache table, which is always valid.
    fn default() -> Self {
        CacheRegistry::from_validated(RegistryConfig::default())
    }
}

impl CacheRegistry {
    /// Build a registry from `config`.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if `config` is invalid (e.g. a zero cleanup
    /// interval or a duplicate cache name).
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(CacheRegistry::from_validated(config))
    }

    fn from_validated(config: RegistryConfig) -> Self {
        CacheRegistry {
            config,
            caches: DashMap::new(),
            global: Arc::new(StatsCounters::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a cache under `name`.
    ///
    /// Registering a name twice replaces the earlier cache and drops its
    /// entries; this is meant to happen once per name at startup.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if `config` is invalid.
    pub fn create_cache<T: CacheValue>(
        &self,
        name: impl Into<String>,
        config: CacheConfig,
    ) -> Result<Arc<Cache<T>>> {
        let name = name.into();
        let cache = Arc::new(Cache::with_counters(
            name.clone(),
            config,
            Arc::clone(&self.global),
            self.config.single_flight,
        )?);

        let erased: Arc<dyn ManagedCache> = cache.clone();
        if self.caches.insert(name.clone(), erased).is_some() {
            warn!("⚠ Cache {} re-created; previous entries dropped", name);
        }

        let config = cache.config();
        info!(
            "✓ Cache {} created (ttl: {:?}, max_size: {:?}, strategy: {})",
            name, config.ttl, config.max_size, config.strategy
        );
        Ok(cache)
    }

    /// Register a cache using its entry in the configured cache table.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if the table has no entry for `name`.
    pub fn create_configured<T: CacheValue>(&self, name: &str) -> Result<Arc<Cache<T>>> {
        let config = self
            .config
            .cache_config(name)
            .cloned()
            .ok_or_else(|| Error::ConfigError(format!("No configuration for cache: {}", name)))?;
        self.create_cache(name, config)
    }

    /// Typed handle to the cache registered under `name`.
    ///
    /// `None` if no such cache exists or it stores a different value type.
    pub fn cache<T: CacheValue>(&self, name: &str) -> Option<Arc<Cache<T>>> {
        let erased = self.managed(name)?;
        match erased.as_any().downcast::<Cache<T>>() {
            Ok(cache) => Some(cache),
            Err(_) => {
                warn!(
                    "⚠ Cache {} does not hold values of type {}",
                    name,
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Sorted names of every registered cache.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn get<T: CacheValue>(&self, name: &str, key: &str) -> Option<T> {
        self.cache::<T>(name)?.get(key)
    }

    /// Store a value; returns `Ok(false)` if no matching cache exists.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` if `ttl_override` is zero.
    pub fn set<T: CacheValue>(
        &self,
        name: &str,
        key: impl Into<String>,
        value: T,
        ttl_override: Option<Duration>,
    ) -> Result<bool> {
        match self.cache::<T>(name) {
            Some(cache) => cache.set(key, value, ttl_override).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn has(&self, name: &str, key: &str) -> bool {
        self.managed(name).map_or(false, |cache| cache.has(key))
    }

    pub fn delete(&self, name: &str, key: &str) -> bool {
        self.managed(name).map_or(false, |cache| cache.delete(key))
    }

    pub fn invalidate_pattern(&self, name: &str, pattern: &str) -> usize {
        self.managed(name)
            .map_or(0, |cache| cache.invalidate_pattern(pattern))
    }

    pub fn clear(&self, name: &str) -> usize {
        self.managed(name).map_or(0, |cache| cache.clear())
    }

    /// Empty every cache; returns the total number of entries removed.
    pub fn clear_all(&self) -> usize {
        self.snapshot().iter().map(|cache| cache.clear()).sum()
    }

    /// Get-or-set against the named cache.
    ///
    /// # Errors
    ///
    /// - `FetchError::CacheNotFound`: no cache `name` holding `T`
    /// - `FetchError::Fetch`: the fetcher failed; nothing was cached
    pub fn get_or_set<T, E, F>(
        &self,
        name: &str,
        key: &str,
        ttl_override: Option<Duration>,
        fetcher: F,
    ) -> std::result::Result<T, FetchError<E>>
    where
        T: CacheValue,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let cache = self
            .cache::<T>(name)
            .ok_or_else(|| FetchError::CacheNotFound(name.to_string()))?;
        cache
            .get_or_set(key, ttl_override, fetcher)
            .map_err(FetchError::Fetch)
    }

    /// Async get-or-fetch against the named cache, single-flight when the
    /// registry is configured for it.
    ///
    /// # Errors
    ///
    /// Same as [`get_or_set`](Self::get_or_set).
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        name: &str,
        key: &str,
        ttl_override: Option<Duration>,
        fetcher: F,
    ) -> std::result::Result<T, FetchError<E>>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let cache = self
            .cache::<T>(name)
            .ok_or_else(|| FetchError::CacheNotFound(name.to_string()))?;
        cache
            .get_or_fetch(key, ttl_override, fetcher)
            .await
            .map_err(FetchError::Fetch)
    }

    /// Remove expired entries from every cache, one cache lock at a time.
    /// Returns the total removed.
    pub fn run_cleanup_sweep(&self) -> usize {
        let removed: usize = self
            .snapshot()
            .iter()
            .map(|cache| cache.purge_expired())
            .sum();

        if removed > 0 {
            info!("🧹 Cleanup sweep removed {} expired entries", removed);
        } else {
            debug!("Cleanup sweep found no expired entries");
        }
        removed
    }

    /// Spawn the periodic cleanup sweep on the current tokio runtime.
    ///
    /// The task runs every `cleanup_interval` until the returned handle is
    /// shut down or the registry is dropped.
    pub fn start_cleanup(self: &Arc<Self>) -> CleanupHandle {
        let registry: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.cleanup_interval;
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            debug!("Registry dropped, cleanup task exiting");
                            break;
                        };
                        registry.run_cleanup_sweep();
                    }
                    _ = signal.notified() => {
                        break;
                    }
                }
            }
        });

        info!("✓ Cache cleanup task started (interval: {:?})", interval);
        CleanupHandle { shutdown, task }
    }

    /// Global counters plus a snapshot of every cache.
    pub fn stats(&self) -> RegistryStats {
        let caches: BTreeMap<String, _> = self
            .snapshot()
            .iter()
            .map(|cache| (cache.name().to_string(), cache.stats()))
            .collect();
        let total_entries = caches.values().map(|s| s.entries).sum();

        RegistryStats {
            global: self.global.snapshot(),
            total_entries,
            caches,
        }
    }

    /// Advisory health status against the configured thresholds.
    pub fn health_check(&self) -> HealthReport {
        let report = HealthReport::evaluate(
            &self.stats(),
            self.config.max_total_entries,
            self.config.min_hit_rate,
        );
        if !report.is_healthy() {
            warn!("⚠ Cache registry degraded: {}", report.details.reasons.join("; "));
        }
        report
    }

    /// Total entries across all caches.
    pub fn total_entries(&self) -> usize {
        self.snapshot().iter().map(|cache| cache.len()).sum()
    }

    /// Zero the global counters. Per-cache counters are kept.
    pub fn reset_stats(&self) {
        self.global.reset();
        info!("Cache registry statistics reset");
    }

    fn managed(&self, name: &str) -> Option<Arc<dyn ManagedCache>> {
        self.caches.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Clone out every cache handle so no table lock is held while working.
    fn snapshot(&self) -> Vec<Arc<dyn ManagedCache>> {
        self.caches
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

/// Handle to the background cleanup task.
pub struct CleanupHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        match self.task.await {
            Ok(()) => info!("✓ Cache cleanup task stopped"),
            Err(e) => warn!("⚠ Cache cleanup task ended abnormally: {}", e),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
