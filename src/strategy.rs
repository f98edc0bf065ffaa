//! Eviction strategies a cache can be configured with.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a cache chooses which entries to drop.
///
/// TTL expiry applies to every strategy; the strategy only decides what
/// goes when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// Least recently used: oldest `last_accessed` goes first.
    #[default]
    Lru,
    /// First in, first out: oldest `created_at` goes first.
    Fifo,
    /// No count-based eviction; expired entries are removed by the periodic
    /// sweep and on access.
    #[serde(alias = "ttl")]
    TtlSweep,
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionStrategy::Lru => write!(f, "lru"),
            EvictionStrategy::Fifo => write!(f, "fifo"),
            EvictionStrategy::TtlSweep => write!(f, "ttl_sweep"),
        }
    }
}

impl FromStr for EvictionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "fifo" => Ok(EvictionStrategy::Fifo),
            "ttl" | "ttl_sweep" => Ok(EvictionStrategy::TtlSweep),
            other => Err(Error::ConfigError(format!(
                "Unknown eviction strategy: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_and_display() {
        for strategy in [
            EvictionStrategy::Lru,
            EvictionStrategy::Fifo,
            EvictionStrategy::TtlSweep,
        ] {
            let parsed: EvictionStrategy = strategy.to_string().parse().expect("Failed to parse");
            assert_eq!(parsed, strategy);
        }

        assert_eq!(
            " TTL ".parse::<EvictionStrategy>().expect("Failed to parse alias"),
            EvictionStrategy::TtlSweep
        );
        assert!("random".parse::<EvictionStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serde_names() {
        let json =
            serde_json::to_string(&EvictionStrategy::TtlSweep).expect("Failed to serialize");
        assert_eq!(json, "\"ttl_sweep\"");

        let alias: EvictionStrategy =
            serde_json::from_str("\"ttl\"").expect("Failed to parse alias");
        assert_eq!(alias, EvictionStrategy::TtlSweep);
        assert_eq!(EvictionStrategy::default(), EvictionStrategy::Lru);
    }
}
