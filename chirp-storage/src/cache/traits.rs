//! Cache backend trait.
//!
//! Backends store opaque serialized values under string keys with a TTL.
//! They are never authoritative: anything they hold can be rebuilt from the
//! graph store.

use std::time::Duration;

use async_trait::async_trait;
use chirp_core::ChirpResult;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be thread-safe. Every method may fail with a
/// `CacheError`; callers above this trait treat any failure as a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value. Expired entries are reported as missing.
    async fn get(&self, key: &str) -> ChirpResult<Option<String>>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> ChirpResult<()>;

    /// Delete one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> ChirpResult<bool>;

    /// Delete every key starting with `prefix`, returning how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> ChirpResult<u64>;

    async fn exists(&self, key: &str) -> ChirpResult<bool>;

    /// Reset the TTL of a live key. Returns `false` if the key is absent.
    async fn refresh(&self, key: &str, ttl: Duration) -> ChirpResult<bool>;

    /// Get cache statistics.
    async fn stats(&self) -> ChirpResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped by expiry or invalidation.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
