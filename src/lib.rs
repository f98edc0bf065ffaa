//! # cache-registry
//!
//! A process-wide registry of independently configured, named in-memory
//! caches.
//!
//! ## Features
//!
//! - **Per-cache policy:** LRU, FIFO or TTL-sweep eviction, each cache with its own TTL and capacity
//! - **Bounded:** a full cache evicts a batch (~10% of capacity) before admitting a new key
//! - **Expire on touch:** expired entries are never returned and are removed when read
//! - **Background sweep:** a tokio task purges expired entries on an interval, with a shutdown handle
//! - **Get-or-set:** sync and async, with optional single-flight to avoid cache stampedes
//! - **Observable:** hit/miss/eviction counters, per-cache stats and an advisory health check
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_registry::{CacheRegistry, RegistryConfig};
//! use std::sync::Arc;
//!
//! // 1. Build the registry at the composition root
//! let registry = Arc::new(CacheRegistry::new(RegistryConfig::default())?);
//!
//! // 2. Create each logical cache once, typed by its value
//! registry.create_configured::<PortfolioKpis>("kpi-data")?;
//! registry.create_configured::<String>("ai-responses")?;
//!
//! // 3. Start the periodic sweep
//! let cleanup = registry.start_cleanup();
//!
//! // 4. Use it
//! let kpis = registry
//!     .get_or_fetch("kpi-data", "portfolio:123:kpis", None, || repo.load_kpis(123))
//!     .await?;
//!
//! // After a write, drop everything derived from the portfolio
//! registry.invalidate_pattern("kpi-data", "^portfolio:123:");
//!
//! // 5. On shutdown
//! cleanup.shutdown().await;
//! ```

#[macro_use]
extern crate log;

pub mod builder;
pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod health;
pub mod key;
pub mod policy;
pub mod registry;
pub mod stats;
pub mod strategy;
pub mod value;

// Re-exports for convenience
pub use builder::FetchBuilder;
pub use cache::{Cache, ManagedCache};
pub use config::{CacheConfig, NamedCacheConfig, RegistryConfig};
pub use entry::CacheEntry;
pub use error::{Error, FetchError, Result};
pub use health::{HealthDetails, HealthReport, HealthStatus};
pub use policy::EvictionPolicy;
pub use registry::{CacheRegistry, CleanupHandle};
pub use stats::{CacheStats, GlobalStats, RegistryStats};
pub use strategy::EvictionStrategy;
pub use value::CacheValue;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
