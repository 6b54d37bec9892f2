//! Read-through cache with write invalidation.
//!
//! `CoherentCache` wraps a [`CacheBackend`] and never lets a cache failure
//! escape: every backend error is logged, reported to the observer and then
//! treated as a miss (reads) or a no-op (writes and deletes). Only the
//! loader passed to [`CoherentCache::get_or_load`] can fail a read.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chirp_core::{ChirpResult, Timestamp};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use super::keys;
use super::read::{CacheRead, CachedValue};
use super::traits::{CacheBackend, CacheStats};

/// Outcome of one cache interaction, reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Write,
    Invalidate,
    Error,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Write => "write",
            CacheOutcome::Invalidate => "invalidate",
            CacheOutcome::Error => "error",
        }
    }
}

/// Callback receiving `(operation, outcome)` for every cache interaction.
pub type CacheObserver = Arc<dyn Fn(&'static str, CacheOutcome) + Send + Sync>;

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false the cache is bypassed entirely.
    pub enabled: bool,
    /// TTL for `feed:<page>:<limit>` entries.
    pub feed_ttl: Duration,
    /// TTL for `profile:<username>` entries.
    pub profile_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feed_ttl: Duration::from_secs(300),
            profile_ttl: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the feed TTL.
    pub fn with_feed_ttl(mut self, ttl: Duration) -> Self {
        self.feed_ttl = ttl;
        self
    }

    /// Set the profile TTL.
    pub fn with_profile_ttl(mut self, ttl: Duration) -> Self {
        self.profile_ttl = ttl;
        self
    }
}

/// Read-through cache that degrades silently to the store.
#[derive(Clone)]
pub struct CoherentCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    observer: Option<CacheObserver>,
    /// Bumped by every invalidation. A loader that started before an
    /// invalidation must not write its result back.
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for CoherentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoherentCache")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl CoherentCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            observer: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach an observer for metrics.
    pub fn with_observer(mut self, observer: CacheObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn observe(&self, op: &'static str, outcome: CacheOutcome) {
        if let Some(observer) = &self.observer {
            observer(op, outcome);
        }
    }

    fn degrade(&self, op: &'static str, key: &str, err: impl std::fmt::Display) {
        tracing::warn!(op, key, error = %err, "cache operation failed, falling back to store");
        self.observe(op, CacheOutcome::Error);
    }

    // ========================================================================
    // PRIMITIVES
    // ========================================================================

    /// Get and decode a value. Any failure reads as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheRead<T>> {
        if !self.config.enabled {
            return None;
        }
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.observe("get", CacheOutcome::Miss);
                return None;
            }
            Err(err) => {
                self.degrade("get", key, err);
                return None;
            }
        };
        match serde_json::from_str::<CachedValue<T>>(&raw) {
            Ok(cached) => {
                self.observe("get", CacheOutcome::Hit);
                Some(CacheRead::from_cache(cached.value, cached.cached_at))
            }
            Err(err) => {
                self.degrade("get", key, err);
                // Undecodable entries would keep missing until expiry.
                let _ = self.backend.delete(key).await;
                None
            }
        }
    }

    /// Encode and store a value.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        self.set_at(key, value, ttl, Utc::now()).await;
    }

    async fn set_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        cached_at: Timestamp,
    ) {
        if !self.config.enabled {
            return;
        }
        let raw = match serde_json::to_string(&CachedValue { cached_at, value }) {
            Ok(raw) => raw,
            Err(err) => {
                self.degrade("set", key, err);
                return;
            }
        };
        match self.backend.set(key, raw, ttl).await {
            Ok(()) => self.observe("set", CacheOutcome::Write),
            Err(err) => self.degrade("set", key, err),
        }
    }

    pub async fn delete(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !self.config.enabled {
            return;
        }
        match self.backend.delete(key).await {
            Ok(_) => self.observe("delete", CacheOutcome::Invalidate),
            Err(err) => self.degrade("delete", key, err),
        }
    }

    /// Drop every key under `prefix`. Returns how many keys went away (0 on failure).
    pub async fn delete_by_prefix(&self, prefix: &str) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !self.config.enabled {
            return 0;
        }
        match self.backend.delete_by_prefix(prefix).await {
            Ok(removed) => {
                self.observe("delete_by_prefix", CacheOutcome::Invalidate);
                tracing::debug!(prefix, removed, "cache namespace invalidated");
                removed
            }
            Err(err) => {
                self.degrade("delete_by_prefix", prefix, err);
                0
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.backend.exists(key).await {
            Ok(exists) => exists,
            Err(err) => {
                self.degrade("exists", key, err);
                false
            }
        }
    }

    /// Extend a live entry's TTL.
    pub async fn refresh(&self, key: &str, ttl: Duration) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.backend.refresh(key, ttl).await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                self.degrade("refresh", key, err);
                false
            }
        }
    }

    // ========================================================================
    // READ-THROUGH
    // ========================================================================

    /// Return the cached value for `key`, or run `loader`, cache its result
    /// for `ttl` and return it. Loader errors propagate; cache errors never do.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> ChirpResult<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ChirpResult<T>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let loaded_at = Utc::now();
        let value = loader().await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.set_at(key, &value, ttl, loaded_at).await;
        } else {
            tracing::debug!(key, "skipping cache fill after concurrent invalidation");
        }
        Ok(CacheRead::from_storage(value))
    }

    // ========================================================================
    // DOMAIN INVALIDATION
    // ========================================================================

    /// Drop every cached feed page.
    pub async fn invalidate_feed(&self) -> u64 {
        self.delete_by_prefix(keys::FEED_PREFIX).await
    }

    /// Drop one cached profile.
    pub async fn invalidate_profile(&self, username: &str) {
        self.delete(&keys::profile(username)).await;
    }

    /// Backend statistics, if the backend is reachable.
    pub async fn stats(&self) -> Option<CacheStats> {
        match self.backend.stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                self.degrade("stats", "*", err);
                None
            }
        }
    }

    /// Whether the backend currently answers.
    pub async fn is_healthy(&self) -> bool {
        self.backend.stats().await.is_ok()
    }
}

// ============================================================================
// TESTS
// ============================================================================
