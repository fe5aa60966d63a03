//! Process-local result cache
//!
//! A `HashMap` behind a `parking_lot::RwLock` with lazy TTL expiry and an
//! optional entry bound. Statistics are lock-free atomics.

use super::{CacheConfig, CacheStatsSnapshot, ResultCache};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cached payload with metadata
struct CacheEntry {
    value: Value,
    created_at: Instant,
    ttl: Option<Duration>,
    /// Insertion sequence, for oldest-first eviction
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.ttl.is_some_and(|ttl| self.created_at.elapsed() > ttl)
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: AtomicU64,
    /// Total cache misses
    pub misses: AtomicU64,
    /// Total evictions
    pub evictions: AtomicU64,
}

/// In-process [`ResultCache`]
///
/// PERF: eviction scans for the oldest entry, O(n) per insert once the
/// bound is reached. Only matters with a small `max_entries`.
pub struct LocalResultCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    next_seq: AtomicU64,
    stats: CacheStats,
}

impl LocalResultCache {
    /// Create a cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Live entries, expired ones included until next touched
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no entry is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                },
                Some(_) => {},
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                },
            }
        }

        // Expired: re-check under the write lock, a fresh value may have landed
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
            debug!(key, "Cache entry expired");
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn store(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }

        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
            ttl: ttl.or(self.config.default_ttl),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut entries = self.entries.write();
        if self.config.max_entries > 0 && !entries.contains_key(key) {
            while entries.len() >= self.config.max_entries {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(key.to_string(), entry);
    }

    /// Get hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl Default for LocalResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[async_trait]
impl ResultCache for LocalResultCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.store(key, value, ttl)
    }

    async fn clear(&self) {
        self.entries.write().clear();
    }

    fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            entries: self.len() as u64,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
        }
    }
}
