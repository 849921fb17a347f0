//! Deterministic cache (C7): content-addressed storage keyed by SHA-256,
//! backed by a Bloom filter for fast probabilistic misses and LRU+TTL
//! eviction, consulted by the LLM router (C10) before provider calls.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod bloom;
pub mod cache;
pub mod error;
pub mod prelude;

pub use bloom::BloomFilter;
pub use cache::{CacheEntry, CacheLimits, CacheStats, DeterministicCache};
pub use error::{CacheError, CacheResult};
