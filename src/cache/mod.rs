//! Response caching for analytics endpoints
//!
//! Analytics payloads are cached per endpoint group (one cache per
//! dimension) under the request URL. The engine never sees the cache: it
//! is attached by the HTTP layer through the [`ResultCache`] capability,
//! so a remote cache can replace the bundled [`LocalResultCache`] without
//! touching query code.
//!
//! # Keys
//!
//! By default the key is the raw path plus query string, so two URLs that
//! differ only in parameter order are distinct entries. With
//! `normalize_keys` the query pairs are sorted first.
//!
//! # Concurrency
//!
//! There is no per-key locking: concurrent identical misses each run the
//! aggregation and the last write wins.

pub mod local;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub use local::LocalResultCache;

// ============================================================================
// Cache Configuration
// ============================================================================

/// Runtime configuration of a result cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Enable cache (default: true)
    pub enabled: bool,

    /// TTL applied when `set` is called without one (default: never expire)
    pub default_ttl: Option<Duration>,

    /// Maximum entries, oldest evicted first (default: 0 = unbounded)
    pub max_entries: usize,

    /// Sort query pairs before keying (default: false)
    pub normalize_keys: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: None,
            max_entries: 0,
            normalize_keys: false,
        }
    }
}

impl CacheConfig {
    /// Set default TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set maximum entries
    pub fn with_max_entries(mut self, entries: usize) -> Self {
        self.max_entries = entries;
        self
    }

    /// Disable caching
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================================================
// Cache Key
// ============================================================================

/// Build the cache key of a request
pub fn cache_key(path: &str, query: Option<&str>, normalize: bool) -> String {
    match query.filter(|q| !q.is_empty()) {
        None => path.to_string(),
        Some(q) if normalize => {
            let mut pairs: Vec<&str> = q.split('&').filter(|p| !p.is_empty()).collect();
            pairs.sort_unstable();
            format!("{}?{}", path, pairs.join("&"))
        },
        Some(q) => format!("{}?{}", path, q),
    }
}

// ============================================================================
// ResultCache Trait
// ============================================================================

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed (including expired entries)
    pub misses: u64,
    /// Live entries
    pub entries: u64,
    /// Entries dropped to honor `max_entries`
    pub evictions: u64,
    /// `hits / (hits + misses)`, 0 when idle
    pub hit_ratio: f64,
}

/// Key to JSON payload store injected into the HTTP layer
#[async_trait]
pub trait ResultCache: Send + Sync + 'static {
    /// Cached payload, if present and fresh
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store a payload; `ttl` overrides the configured default
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Drop every entry
    async fn clear(&self);

    /// Current statistics
    fn stats(&self) -> CacheStatsSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_key_keeps_order() {
        assert_eq!(
            cache_key("/api/v1/fe/papers/years", Some("b=2&a=1"), false),
            "/api/v1/fe/papers/years?b=2&a=1"
        );
        assert_eq!(cache_key("/x", None, false), "/x");
        assert_eq!(cache_key("/x", Some(""), true), "/x");
    }

    #[test]
    fn test_normalized_key_sorts_pairs() {
        assert_eq!(
            cache_key("/x", Some("b=2&a=1"), true),
            cache_key("/x", Some("a=1&b=2"), true)
        );
    }
}
