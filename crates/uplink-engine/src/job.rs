//! Per-attempt job task: compression, transfer, terminal status.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use uplink_core::{UploadPatch, UploadStatus};
use uplink_processing::compress_image;
use uplink_storage::{ProgressCallback, TransferError};

use crate::registry::RegistryInner;

/// Drive one attempt of one upload from fresh state to a terminal status.
///
/// Every write goes through the registry's guarded apply path keyed by
/// `(id, attempt)`; once the entry is removed or retried, remaining writes
/// from this task are silently dropped.
pub(crate) async fn run_attempt(
    inner: Arc<RegistryInner>,
    id: Uuid,
    attempt: u64,
    cancel: CancellationToken,
) {
    let Some((name, content_type, file)) = inner.source(id, attempt) else {
        return;
    };

    let artifact = match compress_image(name, content_type, file, inner.compression()).await {
        Ok(artifact) => artifact,
        Err(err) => {
            tracing::warn!(upload_id = %id, attempt = attempt, error = %err, "Compression failed");
            inner.apply(id, attempt, UploadPatch::status(UploadStatus::Error));
            return;
        }
    };

    inner.apply(
        id,
        attempt,
        UploadPatch {
            compressed_size_in_bytes: Some(artifact.size_in_bytes()),
            ..UploadPatch::default()
        },
    );

    let progress_registry = Arc::clone(&inner);
    let on_progress: ProgressCallback = Arc::new(move |bytes| {
        progress_registry.apply(id, attempt, UploadPatch::transfer_progress(bytes));
    });

    let outcome = inner
        .storage()
        .upload(
            &artifact.filename,
            artifact.content_type,
            artifact.data,
            on_progress,
            cancel,
        )
        .await;

    match outcome {
        Ok(url) => {
            tracing::info!(upload_id = %id, attempt = attempt, url = %url, "Upload succeeded");
            inner.apply(
                id,
                attempt,
                UploadPatch {
                    status: Some(UploadStatus::Success),
                    remote_url: Some(url),
                    ..UploadPatch::default()
                },
            );
        }
        Err(TransferError::Cancelled) => {
            tracing::info!(upload_id = %id, attempt = attempt, "Upload cancelled");
            inner.apply(id, attempt, UploadPatch::status(UploadStatus::Cancelled));
        }
        Err(TransferError::Failed(reason)) => {
            tracing::warn!(upload_id = %id, attempt = attempt, reason = %reason, "Transfer failed");
            inner.apply(id, attempt, UploadPatch::status(UploadStatus::Error));
        }
    }
}
