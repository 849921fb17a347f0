//! `Container` (spec §3): the record produced by the ingest pipeline's
//! containerize stage and owned thereafter by this crate.

use cyb_core::{ContainerId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// Metadata captured alongside a container's bytes (spec §3: "incl.
/// source_url, size, word_count").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerMetadata {
    pub source_url: Option<String>,
    pub size: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub char_count: usize,
}

/// A per-tenant stored unit of ingested content.
///
/// `embedding_ref` is a placeholder for a pluggable embedding-index
/// adapter — embedding implementations are out of scope (spec §1) — so it
/// is carried as an opaque, optional string rather than a typed handle
/// into a vector index this crate doesn't implement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub tenant_id: TenantId,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: ContainerMetadata,
    pub embedding_ref: Option<String>,
    pub created_at: Timestamp,
}

impl Container {
    /// Build a new container with a fresh id, stamped `created_at`, and no
    /// embedding reference yet.
    #[must_use]
    pub fn new(tenant_id: TenantId, bytes: Vec<u8>, content_type: impl Into<String>, metadata: ContainerMetadata) -> Self {
        Self {
            id: ContainerId::new(),
            tenant_id,
            bytes,
            content_type: content_type.into(),
            metadata,
            embedding_ref: None,
            created_at: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn with_embedding_ref(mut self, embedding_ref: impl Into<String>) -> Self {
        self.embedding_ref = Some(embedding_ref.into());
        self
    }
}
