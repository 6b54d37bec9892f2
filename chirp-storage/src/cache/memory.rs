//! In-memory TTL cache backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chirp_core::{CacheError, ChirpResult};
use dashmap::DashMap;
use tokio::time::Instant;

use super::traits::{CacheBackend, CacheStats};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache backend keeping entries in a concurrent map.
///
/// Expiry is lazy: an expired entry is dropped when it is next touched.
/// Expiry uses `tokio::time::Instant`, so paused-clock tests can advance
/// past a TTL without sleeping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheBackend {
    entries: Arc<DashMap<String, Entry>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> ChirpResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "cache backend is offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Remove `key` if it has expired. Returns the live entry otherwise.
    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key).map(|e| e.clone())?;
        if entry.is_live(now) {
            return Some(entry);
        }
        if self
            .entries
            .remove_if(key, |_, e| !e.is_live(now))
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        None
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> ChirpResult<Option<String>> {
        self.check_available()?;
        match self.live_entry(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> ChirpResult<()> {
        self.check_available()?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> ChirpResult<bool> {
        self.check_available()?;
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> ChirpResult<u64> {
        self.check_available()?;
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len()) as u64;
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> ChirpResult<bool> {
        self.check_available()?;
        Ok(self.live_entry(key).is_some())
    }

    async fn refresh(&self, key: &str, ttl: Duration) -> ChirpResult<bool> {
        self.check_available()?;
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stats(&self) -> ChirpResult<CacheStats> {
        self.check_available()?;
        let memory_bytes = self
            .entries
            .iter()
            .map(|e| (e.key().len() + e.value().value.len()) as u64)
            .sum();
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            memory_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
