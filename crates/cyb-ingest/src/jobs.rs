//! Async ingest jobs (spec §4.9): a pending queue drained by a bounded
//! pool of worker tasks. Each worker posts its completion back to the
//! coordinator's own mailbox — the coordinator captures a clone of its
//! sender *before* spawning the worker, so the completion message reaches
//! the coordinator loop rather than the worker itself. Completed jobs are
//! retained for 24h and reaped on a 15-minute timer.

use std::sync::Arc;
use std::time::Duration;

use cyb_core::{JobId, TenantId, Timestamp};
use dashmap::DashMap;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::IngestError;
use crate::fetch::FetchInput;
use crate::pipeline::{IngestOutcome, Pipeline};

/// Retention window for completed/failed jobs (spec §4.9: "retained for 24h").
pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
/// Reap sweep interval (spec §4.9: "reaped on a 15-minute timer").
pub const REAP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// A job's lifecycle state.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Pending,
    Running,
    Completed { container_bytes: usize },
    Skipped { content_type: String },
    Failed { reason: String },
}

/// The record tracked for a submitted job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub status: JobStatus,
    pub submitted_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

enum CoordinatorMsg {
    JobCompleted {
        id: JobId,
        result: Result<IngestOutcome, IngestError>,
    },
}

/// Owns the pending/running/completed job table and the worker pool.
pub struct JobCoordinator {
    jobs: Arc<DashMap<JobId, JobRecord>>,
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
    tx: mpsc::Sender<CoordinatorMsg>,
    _mailbox: JoinHandle<()>,
    _reaper: JoinHandle<()>,
}

impl JobCoordinator {
    /// Spawn a coordinator with `max_concurrent` worker slots.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        let jobs: Arc<DashMap<JobId, JobRecord>> = Arc::new(DashMap::new());
        let (tx, mut rx) = mpsc::channel::<CoordinatorMsg>(1024);

        let mailbox_jobs = Arc::clone(&jobs);
        let mailbox = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    CoordinatorMsg::JobCompleted { id, result } => {
                        if let Some(mut entry) = mailbox_jobs.get_mut(&id) {
                            entry.completed_at = Some(Timestamp::now());
                            entry.status = match result {
                                Ok(IngestOutcome::Success { bytes_ingested, .. }) => {
                                    JobStatus::Completed { container_bytes: bytes_ingested }
                                }
                                Ok(IngestOutcome::Skipped { content_type, .. }) => {
                                    JobStatus::Skipped { content_type }
                                }
                                Err(e) => JobStatus::Failed { reason: e.to_string() },
                            };
                        }
                    }
                }
            }
        });

        let reaper_jobs = Arc::clone(&jobs);
        let reaper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAP_INTERVAL);
            loop {
                interval.tick().await;
                reap(&reaper_jobs);
            }
        });

        Self {
            jobs,
            pipeline,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tx,
            _mailbox: mailbox,
            _reaper: reaper,
        }
    }

    /// Enqueue a job and spawn a worker once a concurrency slot is free.
    /// The coordinator's own sender is cloned before the worker task is
    /// spawned so the completion message is addressed back to this
    /// coordinator's mailbox, not left dangling in the worker.
    pub fn submit(&self, tenant_id: TenantId, input: FetchInput) -> JobId {
        let id = JobId::new();
        self.jobs.insert(
            id,
            JobRecord {
                id,
                tenant_id,
                status: JobStatus::Pending,
                submitted_at: Timestamp::now(),
                completed_at: None,
            },
        );

        let self_tx = self.tx.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let semaphore = Arc::clone(&self.semaphore);
        let jobs = Arc::clone(&self.jobs);

        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            if let Some(mut entry) = jobs.get_mut(&id) {
                entry.status = JobStatus::Running;
            }
            let result = pipeline.ingest(tenant_id, input).await;
            let _ = self_tx.send(CoordinatorMsg::JobCompleted { id, result }).await;
        });

        id
    }

    /// Look up a job's current record.
    #[must_use]
    pub fn status(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.get(&id).map(|r| r.clone())
    }

    /// Number of jobs currently tracked (any status).
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn reap(jobs: &DashMap<JobId, JobRecord>) {
    let now = Timestamp::now();
    let retention_ms = RETENTION.as_millis() as i64;
    let before = jobs.len();
    jobs.retain(|_, record| match record.completed_at {
        Some(completed_at) => now.elapsed_since(completed_at).num_milliseconds() < retention_ms,
        None => true,
    });
    let removed = before - jobs.len();
    if removed > 0 {
        debug!(removed, "reaped expired ingest jobs");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_buckets::BucketStore;
    use cyb_storage::MemoryKvStore;
    use cyb_telemetry::TelemetryBus;
    use crate::ssrf::Environment;
    use std::time::Duration as StdDuration;

    fn coordinator(max_concurrent: usize) -> JobCoordinator {
        let buckets = Arc::new(BucketStore::new(Arc::new(MemoryKvStore::new()), Arc::new(TelemetryBus::new())));
        let pipeline = Arc::new(Pipeline::new(Environment::Development, buckets).unwrap());
        JobCoordinator::new(pipeline, max_concurrent)
    }

    #[tokio::test]
    async fn submitted_job_eventually_completes() {
        let coordinator = coordinator(2);
        let tenant = TenantId::new();
        let id = coordinator.submit(
            tenant,
            FetchInput::Content {
                bytes: b"hello".to_vec(),
                content_type: "text/plain".to_string(),
            },
        );

        let mut record = coordinator.status(id).unwrap();
        for _ in 0..50 {
            if matches!(record.status, JobStatus::Completed { .. }) {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            record = coordinator.status(id).unwrap();
        }
        assert!(matches!(record.status, JobStatus::Completed { container_bytes: 5 }));
    }

    #[tokio::test]
    async fn reap_removes_only_long_completed_jobs() {
        let jobs: DashMap<JobId, JobRecord> = DashMap::new();
        let old_id = JobId::new();
        let fresh_id = JobId::new();
        jobs.insert(
            old_id,
            JobRecord {
                id: old_id,
                tenant_id: TenantId::new(),
                status: JobStatus::Completed { container_bytes: 1 },
                submitted_at: Timestamp::now(),
                completed_at: Some(
                    Timestamp::from_millis(Timestamp::now().as_millis() - RETENTION.as_millis() as i64 - 1).unwrap(),
                ),
            },
        );
        jobs.insert(
            fresh_id,
            JobRecord {
                id: fresh_id,
                tenant_id: TenantId::new(),
                status: JobStatus::Completed { container_bytes: 1 },
                submitted_at: Timestamp::now(),
                completed_at: Some(Timestamp::now()),
            },
        );

        reap(&jobs);
        assert!(jobs.get(&old_id).is_none());
        assert!(jobs.get(&fresh_id).is_some());
    }
}
