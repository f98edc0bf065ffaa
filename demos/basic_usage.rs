//! Basic usage example of the cache registry.

use cache_registry::key::CacheKeyBuilder;
use cache_registry::{CacheRegistry, FetchError, RegistryConfig};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Example value: portfolio KPIs computed from the data store
#[derive(Clone, Serialize, Debug)]
struct PortfolioKpis {
    portfolio_id: u64,
    irr: f64,
    tvpi: f64,
}

#[derive(Debug)]
struct RepositoryError(String);

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repository error: {}", self.0)
    }
}

impl std::error::Error for RepositoryError {}

/// Mock repository that simulates an expensive KPI computation
struct KpiRepository;

impl KpiRepository {
    async fn load(&self, portfolio_id: u64) -> Result<PortfolioKpis, RepositoryError> {
        println!("  [DB] Computing KPIs for portfolio {}", portfolio_id);
        tokio::time::sleep(Duration::from_millis(50)).await;

        match portfolio_id {
            404 => Err(RepositoryError(format!("portfolio {} not found", portfolio_id))),
            _ => Ok(PortfolioKpis {
                portfolio_id,
                irr: 0.1 + portfolio_id as f64 / 1000.0,
                tvpi: 1.35,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cache Registry - Basic Example ===\n");

    // 1. Build the registry and its caches
    println!("1. Creating registry with the default cache table...");
    let config = RegistryConfig::default()
        .with_cleanup_interval(Duration::from_secs(60))
        .with_single_flight(true);
    let registry = Arc::new(CacheRegistry::new(config)?);

    registry.create_configured::<PortfolioKpis>("kpi-data")?;
    registry.create_configured::<String>("ai-responses")?;
    registry.create_configured::<bool>("health-checks")?;
    let cleanup = registry.start_cleanup();

    println!("   ✓ Caches ready: {}\n", registry.names().join(", "));

    let repository = KpiRepository;

    // 2. First request - cache miss, computed by the repository
    println!("2. First request for portfolio 123:");
    let key = CacheKeyBuilder::build(["portfolio", "123", "kpis"]);
    let kpis = registry
        .get_or_fetch("kpi-data", &key, None, || repository.load(123))
        .await?;
    println!(
        "   ✓ KPIs loaded for portfolio {}: IRR {:.1}%\n",
        kpis.portfolio_id,
        kpis.irr * 100.0
    );

    // 3. Second request - cache hit
    println!("3. Second request for portfolio 123:");
    let kpis = registry
        .get_or_fetch("kpi-data", &key, None, || repository.load(123))
        .await?;
    println!("   ✓ KPIs loaded from cache: TVPI {:.2}\n", kpis.tvpi);

    // 4. Failed fetch - nothing is cached
    println!("4. Request for a missing portfolio:");
    let missing = registry
        .get_or_fetch("kpi-data", "portfolio:404:kpis", None, || repository.load(404))
        .await;
    if let Err(FetchError::Fetch(e)) = missing {
        println!("   ✓ Fetch failed and was not cached: {}\n", e);
    }

    // 5. Short-lived override and pattern invalidation
    println!("5. Caching an AI response and invalidating portfolio 123:");
    registry.set(
        "ai-responses",
        "prompt:summary:123",
        "Portfolio 123 outperformed its benchmark".to_string(),
        Some(Duration::from_secs(600)),
    )?;
    let pattern = CacheKeyBuilder::prefix_pattern(["portfolio", "123"]);
    let removed = registry.invalidate_pattern("kpi-data", &pattern);
    println!("   ✓ Invalidated {} KPI entries\n", removed);

    // 6. Statistics and health
    println!("6. Statistics and health:");
    registry.set("health-checks", "db", true, None)?;
    println!("{}", serde_json::to_string_pretty(&registry.stats())?);
    println!("{}\n", serde_json::to_string_pretty(&registry.health_check())?);

    cleanup.shutdown().await;
    println!("=== Example Complete ===\n");

    Ok(())
}
