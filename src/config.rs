//! Cache and registry configuration.
//!
//! TTLs and capacities per logical cache:
//! - KPI data: medium TTL, recomputed from the data store on miss
//! - AI responses: long TTL (identical prompts are expensive to repeat)
//! - Health checks: short TTL, swept rather than capacity-evicted

use crate::error::{Error, Result};
use crate::strategy::EvictionStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between registry cleanup sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Default total-entry count above which the registry reports `degraded`.
pub const DEFAULT_MAX_TOTAL_ENTRIES: usize = 10_000;

/// Default hit rate (fraction) below which the registry reports `degraded`.
pub const DEFAULT_MIN_HIT_RATE: f64 = 0.5;

/// Configuration of one named cache. Immutable once the cache exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live for entries.
    #[serde(rename = "ttl_secs", with = "duration_secs")]
    pub ttl: Duration,

    /// Maximum number of entries; `None` means unbounded.
    #[serde(default)]
    pub max_size: Option<usize>,

    #[serde(default)]
    pub strategy: EvictionStrategy,
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_size: Option<usize>, strategy: EvictionStrategy) -> Self {
        CacheConfig {
            ttl,
            max_size,
            strategy,
        }
    }

    pub fn lru(ttl: Duration, max_size: usize) -> Self {
        Self::new(ttl, Some(max_size), EvictionStrategy::Lru)
    }

    pub fn fifo(ttl: Duration, max_size: usize) -> Self {
        Self::new(ttl, Some(max_size), EvictionStrategy::Fifo)
    }

    pub fn ttl_sweep(ttl: Duration, max_size: Option<usize>) -> Self {
        Self::new(ttl, max_size, EvictionStrategy::TtlSweep)
    }

    /// KPI aggregates (recomputed from the data store on miss).
    pub fn kpi_data() -> Self {
        Self::lru(Duration::from_secs(300), 1000) // 5 minutes
    }

    /// AI provider responses keyed by prompt hash.
    pub fn ai_responses() -> Self {
        Self::lru(Duration::from_secs(3600), 500) // 1 hour
    }

    /// Upstream health probe results.
    pub fn health_checks() -> Self {
        Self::ttl_sweep(Duration::from_secs(30), Some(100))
    }

    /// Reject configurations a cache cannot honour.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` when `max_size == Some(0)` or `ttl` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == Some(0) {
            return Err(Error::ConfigError(
                "max_size must be at least 1".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(Error::ConfigError("ttl must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// A `CacheConfig` under its logical cache name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCacheConfig {
    pub name: String,
    #[serde(flatten)]
    pub config: CacheConfig,
}

/// Registry-wide settings plus the table of logical caches.
///
/// Loadable from JSON:
///
/// ```
/// use cache_registry::RegistryConfig;
///
/// let config = RegistryConfig::from_json(r#"{
///     "cleanup_interval_secs": 60,
///     "caches": [
///         { "name": "kpi-data", "ttl_secs": 300, "max_size": 1000, "strategy": "lru" }
///     ]
/// }"#).unwrap();
///
/// assert_eq!(config.caches.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Interval between background cleanup sweeps.
    #[serde(rename = "cleanup_interval_secs", with = "duration_secs")]
    pub cleanup_interval: Duration,

    /// Total entries across all caches above which health is `degraded`.
    pub max_total_entries: usize,

    /// Global hit rate (fraction) below which health is `degraded`.
    pub min_hit_rate: f64,

    /// Coalesce concurrent misses for the same key in `get_or_fetch`.
    pub single_flight: bool,

    pub caches: Vec<NamedCacheConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_total_entries: DEFAULT_MAX_TOTAL_ENTRIES,
            min_hit_rate: DEFAULT_MIN_HIT_RATE,
            single_flight: false,
            caches: vec![
                NamedCacheConfig {
                    name: "kpi-data".to_string(),
                    config: CacheConfig::kpi_data(),
                },
                NamedCacheConfig {
                    name: "ai-responses".to_string(),
                    config: CacheConfig::ai_responses(),
                },
                NamedCacheConfig {
                    name: "health-checks".to_string(),
                    config: CacheConfig::health_checks(),
                },
            ],
        }
    }
}

impl RegistryConfig {
    /// Registry settings with an empty cache table.
    pub fn empty() -> Self {
        RegistryConfig {
            caches: Vec::new(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// - `Error::SerializationError`: malformed JSON
    /// - `Error::ConfigError`: a value fails validation
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_max_total_entries(mut self, max: usize) -> Self {
        self.max_total_entries = max;
        self
    }

    pub fn with_min_hit_rate(mut self, rate: f64) -> Self {
        self.min_hit_rate = rate;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Add or replace the table entry for `name`.
    pub fn with_cache(mut self, name: impl Into<String>, config: CacheConfig) -> Self {
        let name = name.into();
        self.caches.retain(|c| c.name != name);
        self.caches.push(NamedCacheConfig { name, config });
        self
    }

    /// Look up a cache's configuration by name.
    pub fn cache_config(&self, name: &str) -> Option<&CacheConfig> {
        self.caches
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.config)
    }

    /// # Errors
    ///
    /// `Error::ConfigError` on a zero cleanup interval, a hit-rate threshold
    /// outside `[0, 1]`, duplicate cache names, or an invalid cache entry.
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval.is_zero() {
            return Err(Error::ConfigError(
                "cleanup_interval must be non-zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_hit_rate) {
            return Err(Error::ConfigError(format!(
                "min_hit_rate must be within [0, 1], got {}",
                self.min_hit_rate
            )));
        }
        for (i, named) in self.caches.iter().enumerate() {
            if self.caches[..i].iter().any(|c| c.name == named.name) {
                return Err(Error::ConfigError(format!(
                    "Duplicate cache name: {}",
                    named.name
                )));
            }
            named.config.validate().map_err(|e| match e {
                Error::ConfigError(msg) => Error::ConfigError(format!("{}: {}", named.name, msg)),
                other => other,
            })?;
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
