//! Trait bound for values stored in a cache.

use serde::Serialize;

/// Trait that every value stored in a [`Cache`](crate::Cache) satisfies.
///
/// Values are cloned out on every hit so callers own their copy; the cache
/// keeps its own. `Serialize` is only used to estimate memory footprint
/// for statistics.
///
/// Blanket-implemented for every eligible type, so there is nothing to
/// implement by hand:
///
/// ```
/// use serde::Serialize;
/// use cache_registry::CacheValue;
///
/// #[derive(Clone, Serialize)]
/// struct PortfolioKpi {
///     portfolio_id: u64,
///     irr: f64,
/// }
///
/// fn assert_value<T: CacheValue>() {}
/// assert_value::<PortfolioKpi>();
/// ```
pub trait CacheValue: Clone + Serialize + Send + Sync + 'static {
    /// Serialized size of the value in bytes, using the compact postcard
    /// encoding.
    ///
    /// Returns `None` when the value cannot be serialized; statistics skip
    /// such values instead of failing.
    fn estimated_size(&self) -> Option<usize> {
        match postcard::to_allocvec(self) {
            Ok(bytes) => Some(bytes.len()),
            Err(e) => {
                debug!("Size estimate unavailable: {}", e);
                None
            }
        }
    }
}

impl<T> CacheValue for T where T: Clone + Serialize + Send + Sync + 'static {}
