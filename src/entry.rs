//! A single stored value plus its bookkeeping.

use std::time::Duration;
use tokio::time::Instant;

/// One cached value with its timestamps and hit count.
///
/// Owned by the [`Cache`](crate::Cache) that holds it; only clones of
/// `value` ever leave the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub(crate) value: T,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
    last_accessed: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration, now: Instant) -> Self {
        CacheEntry {
            value,
            created_at: now,
            ttl,
            hit_count: 0,
            last_accessed: now,
        }
    }

    /// `true` once strictly more than `ttl` has elapsed since creation.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    /// Record a hit.
    pub fn touch(&mut self, now: Instant) {
        self.hit_count += 1;
        self.last_accessed = now;
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_strictly_after_ttl() {
        let start = Instant::now();
        let entry = CacheEntry::new("v", Duration::from_secs(10), start);

        assert!(!entry.is_expired(start));
        assert!(!entry.is_expired(start + Duration::from_secs(10)));
        assert!(entry.is_expired(start + Duration::from_millis(10_001)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_updates_bookkeeping() {
        let start = Instant::now();
        let mut entry = CacheEntry::new(1u32, Duration::from_secs(60), start);

        tokio::time::advance(Duration::from_secs(5)).await;
        let later = Instant::now();
        entry.touch(later);
        entry.touch(later);

        assert_eq!(entry.hit_count(), 2);
        assert_eq!(entry.last_accessed(), later);
        assert_eq!(entry.created_at(), start);
        assert_eq!(entry.age(later), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_skew_is_not_expiry() {
        let now = Instant::now();
        let entry = CacheEntry::new((), Duration::from_secs(1), now + Duration::from_secs(30));
        // An entry stamped "in the future" counts as zero age
        assert!(!entry.is_expired(now));
        assert_eq!(entry.age(now), Duration::ZERO);
    }
}
