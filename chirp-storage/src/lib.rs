//! Chirp Storage - Graph Store and Cache
//!
//! Defines the storage abstraction for the social graph, an in-memory
//! implementation, and the cache coherency layer that fronts feed and
//! profile reads.

pub mod cache;
pub mod memory;
pub mod store;

pub use cache::{
    keys as cache_keys, CacheBackend, CacheConfig, CacheObserver, CacheOutcome, CacheRead,
    CacheStats, CoherentCache, InMemoryCacheBackend,
};
pub use memory::InMemoryGraphStore;
pub use store::{GraphStore, TweetMutation, UserMutation};
