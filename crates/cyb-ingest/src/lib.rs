//! Ingest pipeline (C9): fetch (content/path/url, SSRF-safe) → normalize
//! (HTML/text/JSON) → extract (counts, timestamps) → containerize (hands
//! off to `cyb_buckets`). Exposes both a synchronous bounded-batch API
//! ([`batch::ingest_batch`]) and an async job queue ([`jobs::JobCoordinator`]).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod batch;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod jobs;
pub mod normalize;
pub mod pipeline;
pub mod prelude;
pub mod ssrf;

pub use batch::{ingest_batch, DEFAULT_MAX_CONCURRENT};
pub use error::{IngestError, IngestResult};
pub use fetch::{FetchInput, Fetcher};
pub use jobs::{JobCoordinator, JobRecord, JobStatus};
pub use pipeline::{IngestOutcome, Pipeline};
pub use ssrf::Environment;
