//! Expiry checks and eviction victim selection.

use crate::entry::CacheEntry;
use crate::strategy::EvictionStrategy;
use std::collections::HashMap;
use tokio::time::Instant;

/// Decides which entries leave a cache.
///
/// Victim selection is deterministic: entries with equal ordering keys are
/// ordered by their cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    strategy: EvictionStrategy,
}

impl EvictionPolicy {
    pub fn new(strategy: EvictionStrategy) -> Self {
        EvictionPolicy { strategy }
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    /// TTL check shared by every strategy.
    pub fn is_expired<T>(entry: &CacheEntry<T>, now: Instant) -> bool {
        entry.is_expired(now)
    }

    /// Number of entries to drop per admission into a full cache:
    /// `ceil(max_size * 0.1)`, at least one.
    pub fn eviction_count(max_size: usize) -> usize {
        max_size.div_ceil(10).max(1)
    }

    /// Pick the keys to remove.
    ///
    /// `Lru` and `Fifo` return up to `count` keys, oldest first. `TtlSweep`
    /// ignores `count` and returns every expired key.
    pub fn select_victims<T>(
        &self,
        entries: &HashMap<String, CacheEntry<T>>,
        count: usize,
        now: Instant,
    ) -> Vec<String> {
        match self.strategy {
            EvictionStrategy::Lru => oldest_by(entries, count, |e| e.last_accessed()),
            EvictionStrategy::Fifo => oldest_by(entries, count, |e| e.created_at()),
            EvictionStrategy::TtlSweep => expired_keys(entries, now),
        }
    }
}

/// Every expired key, in key order.
fn expired_keys<T>(entries: &HashMap<String, CacheEntry<T>>, now: Instant) -> Vec<String> {
    let mut keys: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| EvictionPolicy::is_expired(entry, now))
        .map(|(key, _)| key.clone())
        .collect();
    keys.sort_unstable();
    keys
}

fn oldest_by<T, F>(entries: &HashMap<String, CacheEntry<T>>, count: usize, stamp: F) -> Vec<String>
where
    F: Fn(&CacheEntry<T>) -> Instant,
{
    if count == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(Instant, &String)> =
        entries.iter().map(|(key, entry)| (stamp(entry), key)).collect();
    ranked.sort_unstable();
    ranked
        .into_iter()
        .take(count)
        .map(|(_, key)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entries_at(specs: &[(&str, u64, u64)], base: Instant) -> HashMap<String, CacheEntry<u32>> {
        // (key, created offset secs, last access offset secs)
        specs
            .iter()
            .map(|(key, created, accessed)| {
                let created_at = base + Duration::from_secs(*created);
                let mut entry = CacheEntry::new(0, Duration::from_secs(100), created_at);
                entry.touch(base + Duration::from_secs(*accessed));
                (key.to_string(), entry)
            })
            .collect()
    }

    #[test]
    fn test_eviction_count_is_ten_percent_rounded_up() {
        assert_eq!(EvictionPolicy::eviction_count(1), 1);
        assert_eq!(EvictionPolicy::eviction_count(2), 1);
        assert_eq!(EvictionPolicy::eviction_count(10), 1);
        assert_eq!(EvictionPolicy::eviction_count(11), 2);
        assert_eq!(EvictionPolicy::eviction_count(100), 10);
        assert_eq!(EvictionPolicy::eviction_count(1000), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_selects_least_recently_accessed() {
        let base = Instant::now();
        let entries = entries_at(&[("a", 0, 9), ("b", 1, 2), ("c", 2, 5)], base);
        let policy = EvictionPolicy::new(EvictionStrategy::Lru);

        assert_eq!(policy.select_victims(&entries, 1, base), vec!["b"]);
        assert_eq!(policy.select_victims(&entries, 2, base), vec!["b", "c"]);
        assert_eq!(policy.select_victims(&entries, 10, base).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_selects_oldest_inserted() {
        let base = Instant::now();
        let entries = entries_at(&[("a", 0, 9), ("b", 1, 2), ("c", 2, 5)], base);
        let policy = EvictionPolicy::new(EvictionStrategy::Fifo);

        assert_eq!(policy.select_victims(&entries, 2, base), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ties_break_by_key() {
        let base = Instant::now();
        let entries = entries_at(&[("zeta", 0, 0), ("alpha", 0, 0), ("mid", 0, 0)], base);

        for strategy in [EvictionStrategy::Lru, EvictionStrategy::Fifo] {
            let policy = EvictionPolicy::new(strategy);
            assert_eq!(policy.select_victims(&entries, 2, base), vec!["alpha", "mid"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_sweep_returns_all_expired_and_ignores_count() {
        let base = Instant::now();
        let mut entries = HashMap::new();
        entries.insert("old1".to_string(), CacheEntry::new(1u32, Duration::from_secs(1), base));
        entries.insert("old2".to_string(), CacheEntry::new(2u32, Duration::from_secs(2), base));
        entries.insert("fresh".to_string(), CacheEntry::new(3u32, Duration::from_secs(60), base));

        let policy = EvictionPolicy::new(EvictionStrategy::TtlSweep);
        let later = base + Duration::from_secs(5);

        assert_eq!(policy.select_victims(&entries, 1, later), vec!["old1", "old2"]);
        assert!(policy.select_victims(&entries, 3, base).is_empty());
    }

    #[test]
    fn test_zero_count_selects_nothing() {
        let base = Instant::now();
        let entries = entries_at(&[("a", 0, 0)], base);
        let policy = EvictionPolicy::new(EvictionStrategy::Lru);
        assert!(policy.select_victims(&entries, 0, base).is_empty());
    }
}
