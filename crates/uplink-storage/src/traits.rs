//! Storage transfer abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked with the cumulative number of bytes acknowledged as
/// transferred so far. Values are monotonically non-decreasing within one
/// transfer and end at the artifact length on completion.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Transfer stage errors.
///
/// Cancellation is a first-class outcome, distinct from transport failure,
/// so callers can tell "the user cancelled" apart from "the network failed".
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Transfer failed: {0}")]
    Failed(String),
}

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Storage transfer backend.
///
/// Implementations move one file's bytes to remote storage and return the
/// storage-assigned reference URL. They must invoke `on_progress` zero or
/// more times before completion and observe `cancel`: once triggered, the
/// transfer stops making forward progress, stops reporting, and resolves
/// with [`TransferError::Cancelled`].
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> TransferResult<String>;
}
