//! Fetch stage (spec §4.9 step 1): resolves one of `{content, path, url}`
//! into raw bytes plus a content type, enforcing the size and SSRF limits.

use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;

use crate::error::{IngestError, IngestResult};
use crate::ssrf::{guard_url, Environment};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum body size accepted from any source (spec §4.9: "max body 50 MiB").
pub const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// The three ways content can enter the pipeline (spec §4.9 step 1).
pub enum FetchInput {
    Content { bytes: Vec<u8>, content_type: String },
    Path { path: PathBuf, content_type: String },
    Url(String),
}

/// Raw bytes plus metadata carried out of the fetch stage.
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub source_url: Option<String>,
}

/// Performs the fetch stage. Holds a single `reqwest::Client` so TCP
/// connections and TLS sessions are reused across fetches.
pub struct Fetcher {
    client: reqwest::Client,
    environment: Environment,
}

impl Fetcher {
    /// Build a fetcher for the given deployment environment. The
    /// production/development distinction governs whether resolved
    /// addresses are checked against private IP ranges (spec §4.9).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::FetchFailed`] if the HTTP client cannot be built.
    pub fn new(environment: Environment) -> IngestResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(RECEIVE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| IngestError::FetchFailed(e.to_string()))?;
        Ok(Self { client, environment })
    }

    /// Resolve a [`FetchInput`] into [`FetchedContent`].
    ///
    /// # Errors
    ///
    /// See [`IngestError`] variants for the failure classification
    /// (content_too_large, redirect_blocked, http_error, blocked_host,
    /// invalid_url, fetch_failed) per spec §4.9.
    pub async fn fetch(&self, input: FetchInput) -> IngestResult<FetchedContent> {
        match input {
            FetchInput::Content { bytes, content_type } => {
                if bytes.len() as u64 > MAX_BODY_BYTES {
                    return Err(IngestError::ContentTooLarge);
                }
                Ok(FetchedContent {
                    bytes,
                    content_type,
                    source_url: None,
                })
            }
            FetchInput::Path { path, content_type } => self.fetch_path(path, content_type).await,
            FetchInput::Url(url) => self.fetch_url(url).await,
        }
    }

    async fn fetch_path(&self, path: PathBuf, content_type: String) -> IngestResult<FetchedContent> {
        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.len() > MAX_BODY_BYTES {
            return Err(IngestError::ContentTooLarge);
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(FetchedContent {
            bytes,
            content_type,
            source_url: Some(path.display().to_string()),
        })
    }

    async fn fetch_url(&self, raw_url: String) -> IngestResult<FetchedContent> {
        let url = guard_url(&raw_url, self.environment)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| IngestError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if status.is_redirection() {
            return Err(IngestError::RedirectBlocked { status: status.as_u16() });
        }
        if !status.is_success() {
            return Err(IngestError::HttpError { status: status.as_u16() });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if let Some(len) = response.content_length() {
            if len > MAX_BODY_BYTES {
                return Err(IngestError::ContentTooLarge);
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| IngestError::FetchFailed(e.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > MAX_BODY_BYTES {
                return Err(IngestError::ContentTooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedContent {
            bytes,
            content_type,
            source_url: Some(raw_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_input_over_limit_is_rejected() {
        let fetcher = Fetcher::new(Environment::Development).unwrap();
        let bytes = vec![0u8; (MAX_BODY_BYTES + 1) as usize];
        let result = fetcher
            .fetch(FetchInput::Content {
                bytes,
                content_type: "application/octet-stream".to_string(),
            })
            .await;
        assert!(matches!(result, Err(IngestError::ContentTooLarge)));
    }

    #[tokio::test]
    async fn content_input_within_limit_passes_through() {
        let fetcher = Fetcher::new(Environment::Development).unwrap();
        let result = fetcher
            .fetch(FetchInput::Content {
                bytes: b"hello".to_vec(),
                content_type: "text/plain".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result.bytes, b"hello");
        assert!(result.source_url.is_none());
    }

    #[tokio::test]
    async fn blocked_url_host_is_rejected_before_any_connection() {
        let fetcher = Fetcher::new(Environment::Production).unwrap();
        let result = fetcher.fetch(FetchInput::Url("http://169.254.169.254/latest/meta-data".to_string())).await;
        assert!(matches!(result, Err(IngestError::BlockedHost { .. })));
    }
}
