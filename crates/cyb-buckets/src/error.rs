//! Container-store error types.

use cyb_core::ContainerId;
use thiserror::Error;

/// Errors raised by the container store.
#[derive(Debug, Error)]
pub enum BucketError {
    #[error("unknown container: {0}")]
    UnknownContainer(ContainerId),

    #[error("container {0} belongs to a different tenant")]
    TenantMismatch(ContainerId),

    #[error(transparent)]
    Storage(#[from] cyb_storage::StorageError),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for container-store operations.
pub type BucketResult<T> = Result<T, BucketError>;
