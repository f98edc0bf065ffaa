//! Hit/miss accounting and read-only statistics snapshots.

use crate::strategy::EvictionStrategy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fraction of lookups served from cache; `0.0` when nothing was looked up.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Monotonic operation counters, shared between a cache and its registry.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletes(&self, count: usize) {
        self.deletes.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GlobalStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let rate = hit_rate(hits, misses);
        GlobalStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: rate,
            hit_rate_percent: rate * 100.0,
        }
    }
}

/// Point-in-time copy of a set of counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// Entries removed by capacity eviction, the cleanup sweep or expiry on access.
    pub evictions: u64,
    /// `hits / (hits + misses)`, in `[0, 1]`.
    pub hit_rate: f64,
    pub hit_rate_percent: f64,
}

/// Snapshot of one cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub max_size: Option<usize>,
    pub ttl_secs: u64,
    pub strategy: EvictionStrategy,
    pub counters: GlobalStats,
    /// Sum of serialized value sizes.
    pub memory_bytes: usize,
    /// Entries whose size could not be estimated.
    pub unsized_entries: usize,
    pub oldest_entry_age_ms: Option<u64>,
    pub newest_entry_age_ms: Option<u64>,
}

/// Registry-wide statistics: global counters plus one snapshot per cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStats {
    pub global: GlobalStats,
    pub total_entries: usize,
    pub caches: BTreeMap<String, CacheStats>,
}

impl RegistryStats {
    pub fn hit_rate(&self) -> f64 {
        self.global.hit_rate
    }

    pub fn cache(&self, name: &str) -> Option<&CacheStats> {
        self.caches.get(name)
    }
}
