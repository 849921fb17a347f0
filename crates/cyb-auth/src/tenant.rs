//! The tenant directory (spec §3: "Tenant — identity namespace.
//! Attributes: id, display name, settings."). Every persisted entity
//! elsewhere carries a `TenantId`; this module is the thin registry that
//! turns a bare id into a named, configurable namespace for the admin CLI
//! and the HTTP edge to report on.

use std::collections::BTreeMap;
use std::sync::Arc;

use cyb_core::{ErrorKind, TenantId, Timestamp};
use cyb_storage::KvStore;
use serde::{Deserialize, Serialize};

use crate::error::{auth_error, storage_error, AuthResult};

const NS_TENANTS: &str = "auth:tenants";

/// A registered tenant namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub display_name: String,
    pub settings: BTreeMap<String, String>,
    pub created_at: Timestamp,
}

impl Tenant {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            display_name: display_name.into(),
            settings: BTreeMap::new(),
            created_at: Timestamp::now(),
        }
    }
}

/// Create/read/list tenants, layered over the same [`KvStore`] the rest of
/// this crate uses for sessions and API keys.
pub struct TenantDirectory {
    store: Arc<dyn KvStore>,
}

impl TenantDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns an error if the store fails to write.
    pub async fn create(&self, display_name: impl Into<String>) -> AuthResult<Tenant> {
        let tenant = Tenant::new(display_name);
        self.save(&tenant).await?;
        Ok(tenant)
    }

    async fn save(&self, tenant: &Tenant) -> AuthResult<()> {
        let bytes = serde_json::to_vec(tenant).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        self.store
            .set(NS_TENANTS, &tenant.id.to_string(), bytes)
            .await
            .map_err(storage_error)
    }

    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if no tenant with that id exists.
    pub async fn get(&self, id: TenantId) -> AuthResult<Tenant> {
        let bytes = self
            .store
            .get(NS_TENANTS, &id.to_string())
            .await
            .map_err(storage_error)?
            .ok_or_else(|| auth_error(ErrorKind::NotFound, "no such tenant"))?;
        serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the store fails to scan.
    pub async fn list(&self) -> AuthResult<Vec<Tenant>> {
        let entries = self.store.scan_prefix(NS_TENANTS, "").await.map_err(storage_error)?;
        entries
            .into_iter()
            .map(|e| serde_json::from_slice(&e.value).map_err(|err| auth_error(ErrorKind::ServerError, err.to_string())))
            .collect()
    }

    /// Set or overwrite a single settings key on an existing tenant.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if no tenant with that id exists.
    pub async fn set_setting(&self, id: TenantId, key: impl Into<String>, value: impl Into<String>) -> AuthResult<Tenant> {
        let mut tenant = self.get(id).await?;
        tenant.settings.insert(key.into(), value.into());
        self.save(&tenant).await?;
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_storage::MemoryKvStore;

    fn directory() -> TenantDirectory {
        TenantDirectory::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn created_tenant_is_listable_and_gettable() {
        let dir = directory();
        let tenant = dir.create("acme").await.unwrap();

        let fetched = dir.get(tenant.id).await.unwrap();
        assert_eq!(fetched.display_name, "acme");

        let all = dir.list().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let dir = directory();
        let err = dir.get(TenantId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn settings_merge_rather_than_replace() {
        let dir = directory();
        let tenant = dir.create("acme").await.unwrap();
        dir.set_setting(tenant.id, "region", "us-east").await.unwrap();
        let updated = dir.set_setting(tenant.id, "tier", "gold").await.unwrap();
        assert_eq!(updated.settings.get("region").map(String::as_str), Some("us-east"));
        assert_eq!(updated.settings.get("tier").map(String::as_str), Some("gold"));
    }
}
