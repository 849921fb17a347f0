//! Ties the fetch → normalize → extract → containerize stages together
//! (spec §4.9) into a single `ingest` call.

use std::sync::Arc;

use cyb_buckets::BucketStore;
use cyb_core::{ContainerId, TenantId};

use crate::error::IngestResult;
use crate::extract::extract;
use crate::fetch::{FetchInput, Fetcher};
use crate::normalize::{normalize, Normalized};
use crate::ssrf::Environment;

/// The outcome of running one item through the pipeline. Each stage can
/// exit early without aborting a surrounding batch (spec §4.9:
/// "failures of individual items do not abort the batch").
pub enum IngestOutcome {
    Success { container_id: ContainerId, bytes_ingested: usize },
    Skipped { reason: &'static str, content_type: String },
}

/// Owns a [`Fetcher`] and a [`BucketStore`], running single items through
/// every stage.
pub struct Pipeline {
    fetcher: Fetcher,
    buckets: Arc<BucketStore>,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns [`crate::error::IngestError`] if the HTTP client underlying
    /// the fetch stage cannot be constructed.
    pub fn new(environment: Environment, buckets: Arc<BucketStore>) -> IngestResult<Self> {
        Ok(Self {
            fetcher: Fetcher::new(environment)?,
            buckets,
        })
    }

    /// Run one item through fetch, normalize, extract, and containerize.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::IngestError`] per the fetch stage's
    /// classification (`content_too_large`, `redirect_blocked`,
    /// `http_error`, `blocked_host`, `invalid_url`, `fetch_failed`) or a
    /// storage failure from containerize.
    pub async fn ingest(&self, tenant_id: TenantId, input: FetchInput) -> IngestResult<IngestOutcome> {
        let fetched = self.fetcher.fetch(input).await?;

        let normalized = normalize(&fetched.bytes, &fetched.content_type)?;
        let text = match normalized {
            Normalized::Text(text) => text,
            Normalized::Skipped { content_type } => {
                return Ok(IngestOutcome::Skipped {
                    reason: "unsupported_content_type",
                    content_type,
                });
            }
        };

        let extracted = extract(&text, fetched.source_url);
        let bytes_ingested = extracted.metadata.size;

        let container = self
            .buckets
            .create(tenant_id, text.into_bytes(), fetched.content_type, extracted.metadata)
            .await?;

        Ok(IngestOutcome::Success {
            container_id: container.id,
            bytes_ingested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_storage::MemoryKvStore;
    use cyb_telemetry::TelemetryBus;

    fn pipeline() -> Pipeline {
        let buckets = Arc::new(BucketStore::new(Arc::new(MemoryKvStore::new()), Arc::new(TelemetryBus::new())));
        Pipeline::new(Environment::Development, buckets).unwrap()
    }

    #[tokio::test]
    async fn html_content_is_stripped_and_containerized() {
        let pipeline = pipeline();
        let tenant = TenantId::new();
        let outcome = pipeline
            .ingest(
                tenant,
                FetchInput::Content {
                    bytes: b"<html><body>Hi</body></html>".to_vec(),
                    content_type: "text/html".to_string(),
                },
            )
            .await
            .unwrap();

        match outcome {
            IngestOutcome::Success { bytes_ingested, .. } => assert_eq!(bytes_ingested, 2),
            IngestOutcome::Skipped { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn blocked_host_url_fails_before_containerize() {
        let pipeline = pipeline();
        let tenant = TenantId::new();
        let result = pipeline
            .ingest(tenant, FetchInput::Url("http://169.254.169.254/latest/meta-data".to_string()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unsupported_content_type_is_skipped_not_stored() {
        let pipeline = pipeline();
        let tenant = TenantId::new();
        let outcome = pipeline
            .ingest(
                tenant,
                FetchInput::Content {
                    bytes: b"\x89PNG".to_vec(),
                    content_type: "image/png".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Skipped { .. }));
    }
}
