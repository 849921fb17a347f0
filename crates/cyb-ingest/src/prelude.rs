//! Convenience re-exports for downstream crates.

pub use crate::batch::{ingest_batch, DEFAULT_MAX_CONCURRENT};
pub use crate::error::{IngestError, IngestResult};
pub use crate::fetch::{FetchInput, Fetcher};
pub use crate::jobs::{JobCoordinator, JobRecord, JobStatus};
pub use crate::pipeline::{IngestOutcome, Pipeline};
pub use crate::ssrf::Environment;
