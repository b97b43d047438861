//! Content-addressed, compressed, TTL'd cache with in-flight deduplication.
//!
//! Values are stored under a [`CacheKey`] fingerprint in any
//! [`PersistentStore`]. [`CandidateCache::get_or_compute`] guarantees that at
//! most one computation per fingerprint runs at a time inside the process;
//! concurrent callers await the same result.

pub mod candidate_cache;
pub mod codec;
pub mod key;
pub mod store;

pub use candidate_cache::{CacheEntry, CandidateCache, Computed};
pub use key::{CacheKey, CacheKind};
pub use store::{FileStore, MemoryStore, PersistentStore};
