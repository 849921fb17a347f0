//! Convenience re-exports for downstream crates.

pub use crate::error::{StorageError, StorageResult};
pub use crate::kv::{KvEntry, KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use crate::kv::SurrealKvStore;
