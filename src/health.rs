//! Advisory health evaluation over registry statistics.

use crate::stats::RegistryStats;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthDetails {
    pub cache_count: usize,
    pub total_entries: usize,
    pub max_total_entries: usize,
    pub hit_rate: f64,
    pub min_hit_rate: f64,
    /// One line per triggered degradation condition.
    pub reasons: Vec<String>,
}

/// Result of [`CacheRegistry::health_check`](crate::CacheRegistry::health_check).
///
/// Purely informational: the registry keeps serving every operation
/// whatever the status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: HealthDetails,
}

impl HealthReport {
    /// `Degraded` when total entries exceed `max_total_entries`, or when at
    /// least one lookup happened and the hit rate is below `min_hit_rate`.
    pub fn evaluate(stats: &RegistryStats, max_total_entries: usize, min_hit_rate: f64) -> Self {
        let mut reasons = Vec::new();

        if stats.total_entries > max_total_entries {
            reasons.push(format!(
                "{} entries exceed threshold of {}",
                stats.total_entries, max_total_entries
            ));
        }

        let lookups = stats.global.hits + stats.global.misses;
        if lookups > 0 && stats.global.hit_rate < min_hit_rate {
            reasons.push(format!(
                "hit rate {:.1}% below {:.1}%",
                stats.global.hit_rate_percent,
                min_hit_rate * 100.0
            ));
        }

        let status = if reasons.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            details: HealthDetails {
                cache_count: stats.caches.len(),
                total_entries: stats.total_entries,
                max_total_entries,
                hit_rate: stats.global.hit_rate,
                min_hit_rate,
                reasons,
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::GlobalStats;
    use std::collections::BTreeMap;

    fn stats(total_entries: usize, hits: u64, misses: u64) -> RegistryStats {
        let rate = crate::stats::hit_rate(hits, misses);
        RegistryStats {
            global: GlobalStats {
                hits,
                misses,
                hit_rate: rate,
                hit_rate_percent: rate * 100.0,
                ..Default::default()
            },
            total_entries,
            caches: BTreeMap::new(),
        }
    }

    #[test]
    fn test_healthy_when_within_thresholds() {
        let report = HealthReport::evaluate(&stats(10, 8, 2), 100, 0.5);
        assert!(report.is_healthy());
        assert!(report.details.reasons.is_empty());
    }

    #[test]
    fn test_no_lookups_is_healthy() {
        let report = HealthReport::evaluate(&stats(0, 0, 0), 100, 0.5);
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_degraded_on_entry_threshold() {
        let report = HealthReport::evaluate(&stats(101, 8, 2), 100, 0.5);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.details.reasons.len(), 1);
    }

    #[test]
    fn test_degraded_on_low_hit_rate() {
        let report = HealthReport::evaluate(&stats(1, 1, 3), 100, 0.5);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.details.reasons[0].starts_with("hit rate 25.0%"));
    }

    #[test]
    fn test_both_conditions_reported() {
        let report = HealthReport::evaluate(&stats(500, 0, 1), 100, 0.5);
        assert_eq!(report.details.reasons.len(), 2);

        let json = serde_json::to_value(&report).expect("Failed to serialize");
        assert_eq!(json["status"], "degraded");
    }
}
