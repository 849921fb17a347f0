//! `ingest_batch` (spec §4.9): runs at most `max_concurrent` pipelines
//! simultaneously; an individual item's failure does not abort the batch.

use std::sync::Arc;

use cyb_core::TenantId;
use futures::stream::{self, StreamExt};

use crate::error::IngestResult;
use crate::fetch::FetchInput;
use crate::pipeline::{IngestOutcome, Pipeline};

/// Default concurrency bound (spec §4.9: "default 10").
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Run every item through the pipeline, never more than `max_concurrent`
/// at once, returning one result per item in input order.
pub async fn ingest_batch(
    pipeline: Arc<Pipeline>,
    tenant_id: TenantId,
    items: Vec<FetchInput>,
    max_concurrent: usize,
) -> Vec<IngestResult<IngestOutcome>> {
    let max_concurrent = max_concurrent.max(1);
    stream::iter(items)
        .map(|item| {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.ingest(tenant_id, item).await }
        })
        .buffered(max_concurrent)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_buckets::BucketStore;
    use cyb_storage::MemoryKvStore;
    use cyb_telemetry::TelemetryBus;
    use crate::ssrf::Environment;

    #[tokio::test]
    async fn batch_continues_past_individual_failures() {
        let buckets = Arc::new(BucketStore::new(Arc::new(MemoryKvStore::new()), Arc::new(TelemetryBus::new())));
        let pipeline = Arc::new(Pipeline::new(Environment::Production, buckets).unwrap());
        let tenant = TenantId::new();

        let items = vec![
            FetchInput::Content {
                bytes: b"ok".to_vec(),
                content_type: "text/plain".to_string(),
            },
            FetchInput::Url("http://169.254.169.254/".to_string()),
            FetchInput::Content {
                bytes: b"also ok".to_vec(),
                content_type: "text/plain".to_string(),
            },
        ];

        let results = ingest_batch(pipeline, tenant, items, 2).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
