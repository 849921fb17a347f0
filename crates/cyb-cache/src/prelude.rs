//! Convenience re-exports for downstream crates.

pub use crate::bloom::BloomFilter;
pub use crate::cache::{CacheEntry, CacheLimits, CacheStats, DeterministicCache};
pub use crate::error::{CacheError, CacheResult};
