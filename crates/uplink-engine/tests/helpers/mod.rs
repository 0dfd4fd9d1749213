//! Shared helpers for engine integration tests: a scriptable storage double,
//! PNG fixtures, and polling utilities.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use tokio_util::sync::CancellationToken;

use uplink_core::SourceFile;
use uplink_storage::{ProgressCallback, StorageClient, TransferError, TransferResult};

/// One scripted transfer outcome, consumed per upload call.
#[allow(dead_code)]
pub enum TransferScript {
    /// Report progress in `steps` cumulative increments, then succeed.
    Succeed { url: String, steps: usize },
    /// Optionally report some progress, then fail with a transport error.
    Fail { reason: String, emit: u64 },
    /// Optionally report some progress, then park until the attempt's token
    /// is triggered and resolve as cancelled.
    HoldUntilCancelled { emit: u64 },
}

/// Storage double driven by per-filename script queues.
///
/// Calls with no script queued succeed with a derived URL, so batch tests
/// don't have to enumerate every file.
pub struct ScriptedStorage {
    scripts: Mutex<HashMap<String, VecDeque<TransferScript>>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Queue the next outcome for uploads of `filename` (the artifact name,
    /// i.e. with the `.webp` extension).
    pub fn script(&self, filename: &str, script: TransferScript) {
        self.scripts
            .lock()
            .unwrap()
            .entry(filename.to_string())
            .or_default()
            .push_back(script);
    }

    /// Number of upload calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageClient for ScriptedStorage {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> TransferResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(filename)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(TransferScript::Succeed {
                url: format!("https://storage.test/{}", filename),
                steps: 2,
            });

        match script {
            TransferScript::Succeed { url, steps } => {
                let total = data.len() as u64;
                let steps = steps.max(1) as u64;
                for step in 1..=steps {
                    if cancel.is_cancelled() {
                        return Err(TransferError::Cancelled);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    on_progress(total * step / steps);
                }
                Ok(url)
            }
            TransferScript::Fail { reason, emit } => {
                if emit > 0 {
                    on_progress(emit);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                Err(TransferError::Failed(reason))
            }
            TransferScript::HoldUntilCancelled { emit } => {
                if emit > 0 {
                    on_progress(emit);
                }
                cancel.cancelled().await;
                Err(TransferError::Cancelled)
            }
        }
    }
}

/// Build an in-memory PNG submission.
pub fn png_file(name: &str, width: u32, height: u32) -> SourceFile {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    SourceFile::new(name, "image/png", buffer)
}

/// Poll `condition` until it holds, panicking after a generous timeout.
pub async fn wait_until<F>(condition: F, what: &str)
where
    F: Fn() -> bool,
{
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}
