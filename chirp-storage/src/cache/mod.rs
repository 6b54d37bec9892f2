//! Cache coherency layer.
//!
//! A string-keyed TTL cache in front of expensive feed and profile reads.
//! Reads go through [`CoherentCache::get_or_load`]; writes invalidate by
//! prefix (`feed:`) or exact key (`profile:<username>`). A failing backend
//! never fails the caller.

pub mod keys;
pub mod memory;
pub mod read;
pub mod read_through;
pub mod traits;

pub use memory::InMemoryCacheBackend;
pub use read::CacheRead;
pub use read_through::{CacheConfig, CacheObserver, CacheOutcome, CoherentCache};
pub use traits::{CacheBackend, CacheStats};
