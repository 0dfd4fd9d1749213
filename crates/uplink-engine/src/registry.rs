//! Upload registry: the keyed store of upload jobs and their entry points.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use uplink_core::{CompressionConfig, SourceFile, Upload, UploadPatch};
use uplink_storage::StorageClient;

use crate::job;
use crate::progress::{overall_progress, OverallProgress};

/// Registry configuration.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    /// Settings handed to the compression stage for every attempt.
    pub compression: CompressionConfig,
}

/// Registry of upload jobs.
///
/// Cheap to clone; all clones share the same underlying store. Submission
/// starts every job immediately without a concurrency cap, and each job
/// writes its own entry back through the guarded update path.
#[derive(Clone)]
pub struct UploadRegistry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    uploads: RwLock<HashMap<Uuid, Upload>>,
    storage: Arc<dyn StorageClient>,
    config: RegistryConfig,
}

impl UploadRegistry {
    pub fn new(storage: Arc<dyn StorageClient>, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                uploads: RwLock::new(HashMap::new()),
                storage,
                config,
            }),
        }
    }

    /// Submit a batch of files.
    ///
    /// Synchronously creates one entry per file with status `Progress` and a
    /// fresh id, spawns its job task, and returns the ids without waiting
    /// for any job to make progress.
    pub fn add_uploads(&self, files: Vec<SourceFile>) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(files.len());

        for file in files {
            let id = Uuid::new_v4();
            let token = CancellationToken::new();
            let upload = Upload::new(id, file, token.clone());

            tracing::info!(
                upload_id = %id,
                name = %upload.name,
                size = upload.original_size_in_bytes,
                "Upload submitted"
            );

            self.inner.write().insert(id, upload);
            tokio::spawn(job::run_attempt(Arc::clone(&self.inner), id, 1, token));
            ids.push(id);
        }

        ids
    }

    /// Request cancellation of an in-flight upload.
    ///
    /// Unknown ids and already-terminal jobs are no-ops. Cancellation only
    /// interrupts the transfer stage; a compression already underway runs to
    /// completion and the token is observed when the transfer would start.
    pub fn cancel_upload(&self, id: Uuid) {
        let token = {
            let uploads = self.inner.read();
            uploads
                .get(&id)
                .filter(|upload| !upload.status.is_terminal())
                .and_then(|upload| upload.cancellation.clone())
        };

        if let Some(token) = token {
            tracing::info!(upload_id = %id, "Cancellation requested");
            token.cancel();
        }
    }

    /// Start a fresh attempt for an upload.
    ///
    /// Unknown ids are a no-op. Any in-flight attempt is cancelled first and
    /// its remaining writes are dropped: the attempt epoch is bumped, the
    /// mutable fields are reset, and a new job task is spawned, all while
    /// holding the registry write lock so no stale writer can interleave.
    pub fn retry_upload(&self, id: Uuid) {
        let spawned = {
            let mut uploads = self.inner.write();
            let Some(upload) = uploads.get_mut(&id) else {
                return;
            };

            if let Some(active) = upload.cancellation.take() {
                active.cancel();
            }

            let token = CancellationToken::new();
            let attempt = upload.begin_attempt(token.clone());
            (attempt, token)
        };

        let (attempt, token) = spawned;
        tracing::info!(upload_id = %id, attempt = attempt, "Retry requested");
        tokio::spawn(job::run_attempt(Arc::clone(&self.inner), id, attempt, token));
    }

    /// Snapshot of every tracked upload. Enumeration order is meaningless.
    pub fn snapshot(&self) -> HashMap<Uuid, Upload> {
        self.inner.read().clone()
    }

    /// Current state of one upload.
    pub fn get(&self, id: Uuid) -> Option<Upload> {
        self.inner.read().get(&id).cloned()
    }

    /// Aggregate completion percentage over the current snapshot.
    pub fn overall_progress(&self) -> OverallProgress {
        overall_progress(self.inner.read().values())
    }
}

impl RegistryInner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Upload>> {
        self.uploads.read().expect("uploads lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Upload>> {
        self.uploads.write().expect("uploads lock poisoned")
    }

    pub(crate) fn storage(&self) -> Arc<dyn StorageClient> {
        Arc::clone(&self.storage)
    }

    /// Apply a patch on behalf of a job attempt.
    ///
    /// Writes are dropped when the entry no longer exists or when the entry
    /// has moved on to a newer attempt, so a superseded job can never
    /// overwrite the state of its replacement.
    pub(crate) fn apply(&self, id: Uuid, attempt: u64, patch: UploadPatch) {
        let mut uploads = self.write();
        match uploads.get_mut(&id) {
            Some(upload) if upload.attempt == attempt => upload.apply(patch),
            _ => {
                tracing::trace!(
                    upload_id = %id,
                    attempt = attempt,
                    "Dropping write from superseded attempt"
                );
            }
        }
    }

    /// Input data for an attempt, if the entry still belongs to it.
    pub(crate) fn source(&self, id: Uuid, attempt: u64) -> Option<(String, String, Bytes)> {
        let uploads = self.read();
        uploads
            .get(&id)
            .filter(|upload| upload.attempt == attempt)
            .map(|upload| {
                (
                    upload.name.clone(),
                    upload.content_type.clone(),
                    upload.file.clone(),
                )
            })
    }

    pub(crate) fn compression(&self) -> CompressionConfig {
        self.config.compression
    }
}
