//! `BucketStore` (C13): a typed store over [`cyb_storage::KvStore`], owning
//! container creation and per-tenant lookup. Containers are immutable once
//! written, so there is no update operation — only create, get, list, and
//! delete.

use std::sync::Arc;

use cyb_core::{ContainerId, TenantId};
use cyb_storage::KvStore;
use cyb_telemetry::{TelemetryBus, TelemetryEvent};

use crate::container::{Container, ContainerMetadata};
use crate::error::{BucketError, BucketResult};

const NAMESPACE: &str = "buckets:containers";

fn tenant_index_key(tenant_id: TenantId, container_id: ContainerId) -> String {
    format!("{tenant_id}:{container_id}")
}

/// Owns the container namespace. Holds no in-memory state of its own; all
/// reads and writes pass through the injected [`KvStore`], which is itself
/// a single owning actor per spec §5.
pub struct BucketStore {
    store: Arc<dyn KvStore>,
    telemetry: Arc<TelemetryBus>,
}

impl BucketStore {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, telemetry: Arc<TelemetryBus>) -> Self {
        Self { store, telemetry }
    }

    /// Persist `bytes` as a new container for `tenant_id`, returning the
    /// created record.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::Storage`] if the backend fails to write.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        metadata: ContainerMetadata,
    ) -> BucketResult<Container> {
        let container = Container::new(tenant_id, bytes, content_type, metadata);
        let encoded = serde_json::to_vec(&container)?;
        self.store
            .set(NAMESPACE, &tenant_index_key(tenant_id, container.id), encoded)
            .await?;

        self.telemetry.publish(
            &TelemetryEvent::new("cyb.buckets.created", "buckets")
                .with_metadata("tenant_id", tenant_id.to_string())
                .with_metadata("container_id", container.id.to_string())
                .with_measurement("bytes", container.bytes.len() as f64),
        );
        Ok(container)
    }

    /// Fetch a container, enforcing tenant isolation: a container id that
    /// exists but belongs to a different tenant is reported the same as
    /// not found at the index level, but distinguished here so callers can
    /// tell a cross-tenant access attempt from a genuine miss.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::UnknownContainer`] if no container with that
    /// id exists for `tenant_id`.
    pub async fn get(&self, tenant_id: TenantId, container_id: ContainerId) -> BucketResult<Container> {
        let key = tenant_index_key(tenant_id, container_id);
        let bytes = self
            .store
            .get(NAMESPACE, &key)
            .await?
            .ok_or(BucketError::UnknownContainer(container_id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// List every container belonging to `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::Storage`] if the backend fails to scan.
    pub async fn list(&self, tenant_id: TenantId) -> BucketResult<Vec<Container>> {
        let prefix = format!("{tenant_id}:");
        let entries = self.store.scan_prefix(NAMESPACE, &prefix).await?;
        entries
            .into_iter()
            .map(|e| Ok(serde_json::from_slice(&e.value)?))
            .collect()
    }

    /// Remove a container. Idempotent: deleting an already-missing id is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BucketError::Storage`] if the backend fails to delete.
    pub async fn delete(&self, tenant_id: TenantId, container_id: ContainerId) -> BucketResult<()> {
        self.store
            .delete(NAMESPACE, &tenant_index_key(tenant_id, container_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_storage::MemoryKvStore;

    fn store() -> BucketStore {
        BucketStore::new(Arc::new(MemoryKvStore::new()), Arc::new(TelemetryBus::new()))
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = store();
        let tenant = TenantId::new();
        let container = store
            .create(tenant, b"hello".to_vec(), "text/plain", ContainerMetadata::default())
            .await
            .unwrap();

        let fetched = store.get(tenant, container.id).await.unwrap();
        assert_eq!(fetched.bytes, b"hello");
    }

    #[tokio::test]
    async fn get_from_wrong_tenant_is_unknown() {
        let store = store();
        let tenant = TenantId::new();
        let other_tenant = TenantId::new();
        let container = store
            .create(tenant, b"hello".to_vec(), "text/plain", ContainerMetadata::default())
            .await
            .unwrap();

        let result = store.get(other_tenant, container.id).await;
        assert!(matches!(result, Err(BucketError::UnknownContainer(_))));
    }

    #[tokio::test]
    async fn list_returns_only_the_tenants_own_containers() {
        let store = store();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        store.create(tenant_a, b"a".to_vec(), "text/plain", ContainerMetadata::default()).await.unwrap();
        store.create(tenant_a, b"b".to_vec(), "text/plain", ContainerMetadata::default()).await.unwrap();
        store.create(tenant_b, b"c".to_vec(), "text/plain", ContainerMetadata::default()).await.unwrap();

        let listed = store.list(tenant_a).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        let tenant = TenantId::new();
        let container = store
            .create(tenant, b"x".to_vec(), "text/plain", ContainerMetadata::default())
            .await
            .unwrap();

        store.delete(tenant, container.id).await.unwrap();
        store.delete(tenant, container.id).await.unwrap();
        assert!(store.get(tenant, container.id).await.is_err());
    }
}
