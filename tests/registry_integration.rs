//! End-to-end behaviour of the registry as its collaborators use it.

use cache_registry::key::CacheKeyBuilder;
use cache_registry::{
    CacheConfig, CacheRegistry, EvictionStrategy, FetchError, HealthStatus, RegistryConfig,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize)]
struct PortfolioKpis {
    portfolio_id: u64,
    irr: f64,
    tvpi: f64,
}

fn kpis(portfolio_id: u64) -> PortfolioKpis {
    PortfolioKpis {
        portfolio_id,
        irr: 0.12,
        tvpi: 1.4,
    }
}

fn app_registry(single_flight: bool) -> Arc<CacheRegistry> {
    let _ = env_logger::builder().is_test(true).try_init();

    let registry = Arc::new(
        CacheRegistry::new(RegistryConfig::default().with_single_flight(single_flight))
            .expect("Failed to create registry"),
    );
    registry
        .create_configured::<PortfolioKpis>("kpi-data")
        .expect("Failed to create kpi-data");
    registry
        .create_configured::<String>("ai-responses")
        .expect("Failed to create ai-responses");
    registry
        .create_configured::<bool>("health-checks")
        .expect("Failed to create health-checks");
    registry
}

fn registry_with_interval(interval: Duration) -> CacheRegistry {
    CacheRegistry::new(RegistryConfig::empty().with_cleanup_interval(interval))
        .expect("Failed to create registry")
}

#[tokio::test]
async fn test_data_layer_read_through_and_invalidate() {
    let registry = app_registry(false);
    let reads = AtomicUsize::new(0);

    for id in [1u64, 2] {
        for metric in ["summary", "cashflows"] {
            let key =
                CacheKeyBuilder::build([&"portfolio" as &dyn std::fmt::Display, &id, &metric]);
            registry
                .get_or_fetch("kpi-data", &key, None, || async {
                    reads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(kpis(id))
                })
                .await
                .expect("Failed to read through");
        }
    }
    assert_eq!(reads.load(Ordering::SeqCst), 4);

    // Portfolio 1 was updated in the data store
    let pattern = CacheKeyBuilder::prefix_pattern(["portfolio", "1"]);
    assert_eq!(registry.invalidate_pattern("kpi-data", &pattern), 2);

    assert!(!registry.has("kpi-data", "portfolio:1:summary"));
    assert_eq!(
        registry.get::<PortfolioKpis>("kpi-data", "portfolio:2:summary"),
        Some(kpis(2))
    );
}

#[tokio::test]
async fn test_ai_responses_are_reused_for_identical_prompts() {
    let registry = app_registry(false);
    let calls = AtomicUsize::new(0);

    for _ in 0..5 {
        let answer = registry
            .get_or_fetch("ai-responses", "prompt:9f2c", None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("Portfolio IRR improved by 2%".to_string())
            })
            .await
            .expect("Failed to fetch");
        assert_eq!(answer, "Portfolio IRR improved by 2%");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = registry.stats();
    assert_eq!(stats.global.hits, 4);
    assert_eq!(stats.global.misses, 1);
}

#[tokio::test]
async fn test_unknown_cache_is_distinct_from_fetch_failure() {
    let registry = app_registry(false);

    let missing = registry
        .get_or_fetch("sessions", "k", None, || async { Ok::<_, String>(1u32) })
        .await;
    assert_eq!(missing, Err(FetchError::CacheNotFound("sessions".to_string())));

    let failed = registry
        .get_or_fetch("ai-responses", "k", None, || async {
            Err::<String, _>("rate limited".to_string())
        })
        .await;
    assert_eq!(failed, Err(FetchError::Fetch("rate limited".to_string())));
    assert!(!registry.has("ai-responses", "k"));
}

#[tokio::test(start_paused = true)]
async fn test_single_flight_coalesces_concurrent_misses() {
    let registry = app_registry(true);
    let calls = AtomicUsize::new(0);

    let results = join_all((0..10).map(|_| {
        registry.get_or_fetch("kpi-data", "portfolio:7:summary", None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, String>(kpis(7))
        })
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result, Ok(kpis(7)));
    }

    // One caller fetched; the other nine were served without recomputation
    let stats = registry.stats();
    assert_eq!(stats.global.misses, 1);
    assert_eq!(stats.global.hits, 9);
    assert!((stats.hit_rate() - 0.9).abs() < 1e-9);
    assert!(registry.health_check().is_healthy());
}

#[tokio::test(start_paused = true)]
async fn test_without_single_flight_every_miss_fetches() {
    let registry = app_registry(false);
    let calls = AtomicUsize::new(0);

    let results = join_all((0..5).map(|_| {
        registry.get_or_fetch("kpi-data", "portfolio:7:summary", None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, String>(kpis(7))
        })
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test(start_paused = true)]
async fn test_single_flight_failure_hands_over_to_next_waiter() {
    let registry = app_registry(true);
    let calls = AtomicUsize::new(0);

    let results = join_all((0..3).map(|_| {
        registry.get_or_fetch("ai-responses", "prompt:1", None, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n == 0 {
                Err("provider timeout".to_string())
            } else {
                Ok(format!("answer from call {}", n))
            }
        })
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(results[0], Err(FetchError::Fetch("provider timeout".to_string())));
    assert_eq!(results[1], Ok("answer from call 1".to_string()));
    assert_eq!(results[2], Ok("answer from call 1".to_string()));

    let stats = registry.stats();
    assert_eq!(stats.global.misses, 2);
    assert_eq!(stats.global.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_sweeps_every_interval() {
    let registry = Arc::new(registry_with_interval(Duration::from_secs(300)));
    let checks = registry
        .create_cache::<bool>(
            "health-checks",
            CacheConfig::new(Duration::from_secs(30), Some(100), EvictionStrategy::TtlSweep),
        )
        .expect("Failed to create cache");
    let handle = registry.start_cleanup();

    checks.set("db", true, None).expect("Failed to set");
    checks.set("provider", false, None).expect("Failed to set");

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(checks.len(), 2);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(checks.len(), 0);

    checks.set("db", true, None).expect("Failed to set");
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(checks.len(), 0);
    assert_eq!(registry.stats().global.evictions, 3);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_stops_on_shutdown() {
    let registry = Arc::new(registry_with_interval(Duration::from_secs(60)));
    let cache = registry
        .create_cache::<u32>("c", CacheConfig::lru(Duration::from_secs(1), 10))
        .expect("Failed to create cache");

    let handle = registry.start_cleanup();
    handle.shutdown().await;

    cache.set("k", 1, None).expect("Failed to set");
    tokio::time::sleep(Duration::from_secs(120)).await;

    // Nothing swept it; it is only removed on touch
    assert_eq!(cache.len(), 1);
    assert!(!cache.has("k"));
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_ends_when_registry_dropped() {
    let registry = Arc::new(registry_with_interval(Duration::from_secs(60)));
    let handle = registry.start_cleanup();
    drop(registry);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!handle.is_running());
}

#[test]
fn test_health_report_for_monitoring_endpoint() {
    let registry = CacheRegistry::new(RegistryConfig::empty().with_max_total_entries(3))
        .expect("Failed to create registry");
    let cache = registry
        .create_cache::<String>("kpi-data", CacheConfig::kpi_data())
        .expect("Failed to create cache");

    let report = registry.health_check();
    assert_eq!(report.status, HealthStatus::Healthy);

    for i in 0..4 {
        cache
            .set(format!("portfolio:{}:summary", i), "x".to_string(), None)
            .expect("Failed to set");
    }

    let report = registry.health_check();
    assert_eq!(report.status, HealthStatus::Degraded);

    let json = serde_json::to_value(registry.stats()).expect("Failed to serialize stats");
    assert_eq!(json["total_entries"], 4);
    assert_eq!(json["caches"]["kpi-data"]["strategy"], "lru");
    assert_eq!(json["global"]["sets"], 4);
}
