use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Lifecycle status of an upload job.
///
/// Processing starts immediately on submission, so `Progress` is the initial
/// state; there is no queued state. `Success`, `Error` and `Cancelled` are
/// terminal until an explicit retry starts a fresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Progress,
    Success,
    Error,
    Cancelled,
}

impl UploadStatus {
    /// Whether the job has finished its current attempt.
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadStatus::Progress)
    }
}

/// A file handed to the registry for upload.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// One tracked upload job.
///
/// Owned by the registry; mutated only through [`Upload::apply`] by the job
/// driving the current attempt, or by explicit cancel/retry requests. `id`,
/// `name`, `content_type` and `file` are fixed at submission and survive
/// retries.
#[derive(Clone, Debug)]
pub struct Upload {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    /// Original, unmodified input bytes.
    pub file: Bytes,
    pub status: UploadStatus,
    pub original_size_in_bytes: u64,
    /// Size of the compressed artifact; absent until compression completes,
    /// cleared when a retry starts a new attempt.
    pub compressed_size_in_bytes: Option<u64>,
    /// Bytes acknowledged as transferred in the current attempt.
    pub upload_size_in_bytes: u64,
    /// Storage-assigned URL; present exactly when `status` is `Success`.
    pub remote_url: Option<String>,
    /// Attempt epoch. Starts at 1 and increments on every retry; writes from
    /// a superseded attempt are rejected by comparing against this value.
    pub attempt: u64,
    /// Cancellation token for the in-flight attempt; absent once the attempt
    /// reaches a terminal status.
    pub cancellation: Option<CancellationToken>,
}

impl Upload {
    /// Create a fresh entry for a submitted file, ready for its first attempt.
    pub fn new(id: Uuid, source: SourceFile, cancellation: CancellationToken) -> Self {
        let original_size_in_bytes = source.data.len() as u64;
        Self {
            id,
            name: source.name,
            content_type: source.content_type,
            file: source.data,
            status: UploadStatus::Progress,
            original_size_in_bytes,
            compressed_size_in_bytes: None,
            upload_size_in_bytes: 0,
            remote_url: None,
            attempt: 1,
            cancellation: Some(cancellation),
        }
    }

    /// Apply a partial update to the mutable fields.
    ///
    /// This is the single mutation path for attempt-driven writes. Transfer
    /// progress is monotonic within an attempt: a smaller value never
    /// overwrites a larger one. A terminal status drops the attempt's
    /// cancellation token.
    pub fn apply(&mut self, patch: UploadPatch) {
        if let Some(size) = patch.compressed_size_in_bytes {
            self.compressed_size_in_bytes = Some(size);
        }
        if let Some(bytes) = patch.upload_size_in_bytes {
            self.upload_size_in_bytes = self.upload_size_in_bytes.max(bytes);
        }
        if let Some(url) = patch.remote_url {
            self.remote_url = Some(url);
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status.is_terminal() {
                self.cancellation = None;
            }
        }
    }

    /// Reset mutable state for a new attempt (initial semantics of a retry).
    ///
    /// Bumps the attempt epoch, clears results of any prior attempt, and
    /// installs the new attempt's cancellation token.
    pub fn begin_attempt(&mut self, cancellation: CancellationToken) -> u64 {
        self.attempt += 1;
        self.status = UploadStatus::Progress;
        self.compressed_size_in_bytes = None;
        self.upload_size_in_bytes = 0;
        self.remote_url = None;
        self.cancellation = Some(cancellation);
        self.attempt
    }
}

/// Partial update for an [`Upload`], applied via [`Upload::apply`].
///
/// Fields left as `None` are untouched.
#[derive(Debug, Default, Clone)]
pub struct UploadPatch {
    pub status: Option<UploadStatus>,
    pub compressed_size_in_bytes: Option<u64>,
    pub upload_size_in_bytes: Option<u64>,
    pub remote_url: Option<String>,
}

impl UploadPatch {
    pub fn status(status: UploadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn transfer_progress(bytes: u64) -> Self {
        Self {
            upload_size_in_bytes: Some(bytes),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_upload() -> Upload {
        Upload::new(
            Uuid::new_v4(),
            SourceFile::new("photo.png", "image/png", vec![0u8; 64]),
            CancellationToken::new(),
        )
    }

    #[test]
    fn new_upload_starts_in_progress() {
        let upload = test_upload();
        assert_eq!(upload.status, UploadStatus::Progress);
        assert_eq!(upload.original_size_in_bytes, 64);
        assert_eq!(upload.upload_size_in_bytes, 0);
        assert_eq!(upload.compressed_size_in_bytes, None);
        assert_eq!(upload.remote_url, None);
        assert_eq!(upload.attempt, 1);
        assert!(upload.cancellation.is_some());
    }

    #[test]
    fn progress_is_monotonic_within_attempt() {
        let mut upload = test_upload();
        upload.apply(UploadPatch::transfer_progress(500));
        upload.apply(UploadPatch::transfer_progress(200));
        assert_eq!(upload.upload_size_in_bytes, 500);
        upload.apply(UploadPatch::transfer_progress(800));
        assert_eq!(upload.upload_size_in_bytes, 800);
    }

    #[test]
    fn terminal_status_drops_cancellation_token() {
        let mut upload = test_upload();
        upload.apply(UploadPatch::status(UploadStatus::Success));
        assert!(upload.cancellation.is_none());
    }

    #[test]
    fn begin_attempt_resets_mutable_fields() {
        let mut upload = test_upload();
        upload.apply(UploadPatch {
            status: Some(UploadStatus::Error),
            compressed_size_in_bytes: Some(32),
            upload_size_in_bytes: Some(16),
            remote_url: None,
        });

        let attempt = upload.begin_attempt(CancellationToken::new());

        assert_eq!(attempt, 2);
        assert_eq!(upload.status, UploadStatus::Progress);
        assert_eq!(upload.compressed_size_in_bytes, None);
        assert_eq!(upload.upload_size_in_bytes, 0);
        assert_eq!(upload.remote_url, None);
        assert!(upload.cancellation.is_some());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UploadStatus::Progress).unwrap(),
            "\"progress\""
        );
        assert_eq!(
            serde_json::to_string(&UploadStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        let parsed: UploadStatus = serde_json::from_str("\"success\"").unwrap();
        assert_eq!(parsed, UploadStatus::Success);
    }

    #[test]
    fn terminal_states() {
        assert!(!UploadStatus::Progress.is_terminal());
        assert!(UploadStatus::Success.is_terminal());
        assert!(UploadStatus::Error.is_terminal());
        assert!(UploadStatus::Cancelled.is_terminal());
    }
}
