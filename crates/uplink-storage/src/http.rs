//! HTTP multipart storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::traits::{ProgressCallback, StorageClient, TransferError, TransferResult};

/// Default timeout for a whole upload request in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Chunk size for the request body stream (64KB). Progress is reported once
/// per chunk as the transport pulls it.
const CHUNK_SIZE: usize = 64 * 1024;

/// Storage backend posting multipart bodies to an HTTP endpoint.
///
/// The endpoint accepts a single `file` field and answers a JSON object with
/// a string `url` field on success. Every other response is a transfer
/// failure.
#[derive(Clone, Debug)]
pub struct HttpStorageClient {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpStorageClient {
    /// Create a client for the given upload endpoint with default settings.
    pub fn new(endpoint: impl Into<String>) -> TransferResult<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom whole-request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> TransferResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Failed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> TransferResult<String> {
        let total = data.len() as u64;
        let body = reqwest::Body::wrap_stream(progress_stream(data, on_progress));

        let part = multipart::Part::stream_with_length(body, total)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| TransferError::Failed(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let request = self.client.post(&self.endpoint).multipart(form);

        let transfer = async {
            let response = request
                .send()
                .await
                .map_err(|e| TransferError::Failed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::Failed(format!(
                    "Upload endpoint returned status {}",
                    status
                )));
            }

            let parsed: UploadResponse = response
                .json()
                .await
                .map_err(|e| TransferError::Failed(format!("Invalid upload response: {}", e)))?;

            if parsed.url.is_empty() {
                return Err(TransferError::Failed(
                    "Upload endpoint returned an empty url".to_string(),
                ));
            }

            Ok(parsed.url)
        };

        // Dropping the in-flight request aborts the connection, so no more
        // progress callbacks fire after cancellation is observed.
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(filename = filename, "Transfer cancelled");
                Err(TransferError::Cancelled)
            }
            result = transfer => result,
        }
    }
}

/// Lazy chunked stream over the artifact bytes.
///
/// Each chunk reports the cumulative byte count through `on_progress` as the
/// transport pulls it, so progress reflects bytes handed to the wire rather
/// than a single up-front jump.
fn progress_stream(
    data: Bytes,
    on_progress: ProgressCallback,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    let total = data.len();
    let mut offset = 0usize;

    futures::stream::iter(std::iter::from_fn(move || {
        if offset >= total {
            return None;
        }
        let end = (offset + CHUNK_SIZE).min(total);
        let chunk = data.slice(offset..end);
        offset = end;
        on_progress(end as u64);
        Some(Ok(chunk))
    }))
}
