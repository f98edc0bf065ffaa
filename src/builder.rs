//! Builder pattern for get-or-fetch operations.

use crate::cache::Cache;
use crate::value::CacheValue;
use std::future::Future;
use std::time::Duration;

/// Fluent builder for a single get-or-fetch against one cache.
///
/// Provides chainable methods to override the TTL and retry a failing
/// fetcher.
///
/// # Example
///
/// ```ignore
/// let kpis = cache
///     .fetch("portfolio:123:kpis")
///     .with_ttl(Duration::from_secs(60))
///     .with_retry(2)
///     .execute(|| repo.load_kpis(123))
///     .await?;
/// ```
pub struct FetchBuilder<'a, T: CacheValue> {
    cache: &'a Cache<T>,
    key: &'a str,
    ttl_override: Option<Duration>,
    retry_count: u32,
}

impl<'a, T: CacheValue> FetchBuilder<'a, T> {
    pub(crate) fn new(cache: &'a Cache<T>, key: &'a str) -> Self {
        Self {
            cache,
            key,
            ttl_override: None,
            retry_count: 0,
        }
    }

    /// Override the cache's TTL for the stored value.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    /// Retry a failing fetcher up to `count` more times.
    pub fn with_retry(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Return the cached value or run `fetcher`, storing its result.
    ///
    /// Failed fetches are retried up to `retry_count` times with exponential
    /// backoff (100 ms, 200 ms, 400 ms, ...). A failure never writes to the
    /// cache; if every attempt fails, the last error is returned.
    pub async fn execute<E, F, Fut>(self, mut fetcher: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0;
        let max_attempts = self.retry_count + 1; // +1 for initial attempt

        loop {
            attempts += 1;

            match self
                .cache
                .get_or_fetch(self.key, self.ttl_override, || fetcher())
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempts >= max_attempts {
                        return Err(e);
                    }

                    debug!(
                        "Fetch for {}:{} failed (attempt {}/{}), retrying...",
                        self.cache.name(),
                        self.key,
                        attempts,
                        max_attempts
                    );

                    let delay = Duration::from_millis(100 * 2_u64.pow(attempts - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
