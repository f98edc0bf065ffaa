//! Cache key composition.
//!
//! Keys are opaque strings; by convention collaborators namespace them as
//! `segment:segment:...` so related keys can be invalidated together.

use std::fmt::Display;

/// Builds colon-separated cache keys and the matching invalidation patterns.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Join segments with `:`.
    ///
    /// ```
    /// use cache_registry::key::CacheKeyBuilder;
    ///
    /// assert_eq!(CacheKeyBuilder::build(["portfolio", "123", "irr"]), "portfolio:123:irr");
    /// ```
    pub fn build<I, S>(segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        let mut key = String::new();
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                key.push(':');
            }
            key.push_str(&segment.to_string());
        }
        key
    }

    /// Regex matching every key that starts with the given segments.
    ///
    /// Segment text is escaped, so `portfolio` + `1.5` only matches a literal
    /// `portfolio:1.5:` prefix.
    ///
    /// ```
    /// use cache_registry::key::CacheKeyBuilder;
    ///
    /// assert_eq!(CacheKeyBuilder::prefix_pattern(["portfolio", "123"]), "^portfolio:123:");
    /// ```
    pub fn prefix_pattern<I, S>(segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        format!("^{}:", regex::escape(&Self::build(segments)))
    }
}
