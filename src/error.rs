//! Error types for cache and registry operations.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by cache construction and per-call argument checks.
///
/// Misses are not errors: an absent or expired key is reported as `None`
/// or `false` by the operation that looked it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid cache or registry configuration (e.g. `max_size == 0`).
    ConfigError(String),
    /// Invalid argument to an individual operation (e.g. zero TTL override).
    ValidationError(String),
    /// Configuration could not be (de)serialized.
    SerializationError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// Failure of a registry-level get-or-set.
///
/// Keeps "no such cache" apart from the fetcher's own error, which is
/// passed through untouched.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchError<E> {
    /// No cache with this name and value type is registered.
    CacheNotFound(String),
    /// The fetcher failed; nothing was cached.
    Fetch(E),
}

impl<E> FetchError<E> {
    /// Returns the fetcher error, if that is what this is.
    pub fn into_fetch_error(self) -> Option<E> {
        match self {
            FetchError::Fetch(e) => Some(e),
            FetchError::CacheNotFound(_) => None,
        }
    }

    pub fn is_cache_not_found(&self) -> bool {
        matches!(self, FetchError::CacheNotFound(_))
    }
}

impl<E: fmt::Display> fmt::Display for FetchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::CacheNotFound(name) => write!(f, "Cache not found: {}", name),
            FetchError::Fetch(e) => write!(f, "Fetch failed: {}", e),
        }
    }
}

impl<E> std::error::Error for FetchError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Fetch(e) => Some(e),
            FetchError::CacheNotFound(_) => None,
        }
    }
}
