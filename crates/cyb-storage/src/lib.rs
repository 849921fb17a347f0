//! Namespaced key-value persistence.
//!
//! Provides a single [`KvStore`] abstraction over two backends:
//!
//! - [`MemoryKvStore`] — in-process `DashMap`, always available, used in
//!   tests and ephemeral deployments.
//! - [`SurrealKvStore`] — embedded, versioned LSM-tree store backed by
//!   `SurrealKV`, enabled with the **`kv`** feature, used for durable
//!   on-disk deployments.
//!
//! Components layer typed stores on top of [`KvStore`] (the audit chain's
//! entries and chain heads, the auth manager's sessions and API keys, the
//! container registry) rather than embedding a concrete backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod kv;
pub mod prelude;

pub use error::{StorageError, StorageResult};
pub use kv::{KvEntry, KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
