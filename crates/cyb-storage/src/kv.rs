//! Namespaced byte-level key-value storage.
//!
//! Every component that needs durable state (the audit chain's entries and
//! chain heads, the auth manager's sessions and API keys, the container
//! registry) stores it through [`KvStore`] rather than talking to a
//! concrete backend directly, so tests can swap in [`MemoryKvStore`]
//! without touching call sites.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};

/// A single stored record, returned by range/scan operations.
#[derive(Debug, Clone)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
}

/// Namespaced key-value storage.
///
/// Namespaces partition the keyspace (e.g. `audit:entries` vs.
/// `audit:session_index`) without requiring a separate store per concern.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored at `namespace`/`key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to read.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` at `namespace`/`key`, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to write.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove the value at `namespace`/`key`. Removing a missing key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to delete.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// List all entries in `namespace` whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to scan.
    async fn scan_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<KvEntry>>;

    /// Persist any buffered writes durably.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to flush.
    async fn flush(&self) -> StorageResult<()>;
}

fn composite_key(namespace: &str, key: &str) -> String {
    format!("{namespace}\u{0}{key}")
}

/// In-memory [`KvStore`], used in tests and for `mem://`-style ephemeral
/// deployments.
#[derive(Default)]
pub struct MemoryKvStore {
    data: dashmap::DashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: dashmap::DashMap::new(),
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.get(&composite_key(namespace, key)).map(|v| v.clone()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.data.insert(composite_key(namespace, key), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        self.data.remove(&composite_key(namespace, key));
        Ok(())
    }

    async fn scan_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<KvEntry>> {
        let ns_marker = format!("{namespace}\u{0}");
        let mut out = Vec::new();
        for entry in &self.data {
            if let Some(rest) = entry.key().strip_prefix(&ns_marker) {
                if rest.starts_with(prefix) {
                    out.push(KvEntry {
                        key: rest.to_string(),
                        value: entry.value().clone(),
                    });
                }
            }
        }
        Ok(out)
    }

    async fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// A [`KvStore`] scoped to a single fixed namespace, so callers that only
/// ever touch one namespace don't have to repeat it at every call site.
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl ScopedKvStore {
    #[must_use]
    pub fn new(inner: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            namespace: namespace.into(),
        }
    }

    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.namespace, key).await
    }

    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(&self.namespace, key, value).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(&self.namespace, key).await
    }

    pub async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<KvEntry>> {
        self.inner.scan_prefix(&self.namespace, prefix).await
    }
}

/// `SurrealKV`-backed [`KvStore`], used for durable on-disk deployments.
///
/// `SurrealKV` is an embedded, versioned LSM-tree store with its own
/// internal locking; operations are synchronous in-process calls, wrapped
/// here behind a mutex so the async trait can be satisfied without a
/// separate worker thread.
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    inner: tokio::sync::Mutex<surrealkv::Store>,
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Open or create a `SurrealKV` store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the store cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let mut opts = surrealkv::Options::new();
        opts.dir = path.as_ref().to_path_buf();
        let store = surrealkv::Store::new(opts)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self {
            inner: tokio::sync::Mutex::new(store),
        })
    }
}

#[cfg(feature = "kv")]
#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let store = self.inner.lock().await;
        let mut txn = store
            .begin()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let full_key = composite_key(namespace, key);
        txn.get(full_key.as_bytes())
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let store = self.inner.lock().await;
        let mut txn = store
            .begin()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let full_key = composite_key(namespace, key);
        txn.set(full_key.as_bytes(), &value)
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        txn.commit()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let store = self.inner.lock().await;
        let mut txn = store
            .begin()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let full_key = composite_key(namespace, key);
        txn.delete(full_key.as_bytes())
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        txn.commit()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn scan_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<KvEntry>> {
        let store = self.inner.lock().await;
        let txn = store
            .begin()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let full_prefix = composite_key(namespace, prefix);
        let ns_prefix = format!("{namespace}\u{0}");
        let range = txn
            .scan(full_prefix.as_bytes()..)
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let mut out = Vec::new();
        for (k, v) in range {
            let Ok(key_str) = String::from_utf8(k) else {
                continue;
            };
            if let Some(rest) = key_str.strip_prefix(&ns_prefix) {
                if rest.starts_with(prefix) {
                    out.push(KvEntry {
                        key: rest.to_string(),
                        value: v,
                    });
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(out)
    }

    async fn flush(&self) -> StorageResult<()> {
        let store = self.inner.lock().await;
        store
            .flush()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryKvStore::new();
        store.set("ns", "k1", b"v1".to_vec()).await.unwrap();
        assert_eq!(store.get("ns", "k1").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("ns", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_the_key() {
        let store = MemoryKvStore::new();
        store.set("ns", "k1", b"v1".to_vec()).await.unwrap();
        store.delete("ns", "k1").await.unwrap();
        assert_eq!(store.get("ns", "k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = MemoryKvStore::new();
        store.set("a", "k1", b"from-a".to_vec()).await.unwrap();
        store.set("b", "k1", b"from-b".to_vec()).await.unwrap();
        assert_eq!(store.get("a", "k1").await.unwrap(), Some(b"from-a".to_vec()));
        assert_eq!(store.get("b", "k1").await.unwrap(), Some(b"from-b".to_vec()));
    }

    #[tokio::test]
    async fn scan_prefix_returns_only_matching_keys() {
        let store = MemoryKvStore::new();
        store.set("ns", "session:1", b"a".to_vec()).await.unwrap();
        store.set("ns", "session:2", b"b".to_vec()).await.unwrap();
        store.set("ns", "other:1", b"c".to_vec()).await.unwrap();
        let mut found = store.scan_prefix("ns", "session:").await.unwrap();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].key, "session:1");
    }

    #[tokio::test]
    async fn scoped_store_prepends_its_namespace() {
        let inner: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(Arc::clone(&inner), "audit:entries");
        scoped.set("e1", b"entry".to_vec()).await.unwrap();
        assert_eq!(
            inner.get("audit:entries", "e1").await.unwrap(),
            Some(b"entry".to_vec())
        );
    }
}
