//! Failure classification for the ingest pipeline (spec §4.9).

use cyb_core::ErrorKind;
use thiserror::Error;

/// The fixed set of ways a pipeline stage can fail, preserving the stage
/// label as the spec requires ("stage label preserved").
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("content exceeds the maximum body size")]
    ContentTooLarge,

    #[error("redirect blocked (status {status})")]
    RedirectBlocked { status: u16 },

    #[error("upstream returned HTTP {status}")]
    HttpError { status: u16 },

    #[error("host is not permitted: {host}")]
    BlockedHost { host: String },

    #[error("not a valid http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("local file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("container store error: {0}")]
    Bucket(#[from] cyb_buckets::BucketError),
}

impl IngestError {
    /// Map to the canonical cross-cutting kind (spec §7), used for
    /// telemetry tagging and HTTP status mapping at the edge.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContentTooLarge => ErrorKind::ContentTooLarge,
            Self::RedirectBlocked { .. } => ErrorKind::RedirectBlocked,
            Self::HttpError { .. } => ErrorKind::RequestFailed,
            Self::BlockedHost { .. } => ErrorKind::BlockedHost,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::FetchFailed(_) => ErrorKind::RequestFailed,
            Self::Io(_) => ErrorKind::RequestFailed,
            Self::Bucket(_) => ErrorKind::StorageError,
        }
    }
}

/// Convenience alias for ingest pipeline operations.
pub type IngestResult<T> = Result<T, IngestError>;
