//! Aggregate progress over a registry snapshot.

use serde::Serialize;
use uplink_core::{Upload, UploadStatus};

/// Global completion estimate across all tracked uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverallProgress {
    /// Whether any upload is still in progress.
    pub is_any_pending: bool,
    /// Completion percentage in `0..=100`.
    pub percentage: u8,
}

/// Compute the aggregate percentage from the current upload set.
///
/// With nothing pending the percentage is 100, covering the empty registry
/// and the everything-finished case alike. Otherwise each upload contributes
/// its compressed size to the total once compression completed (its original
/// size before that), and its transferred bytes only after compression
/// completed, so a still-compressing job counts as zero progress rather than
/// partial credit. The percentage is computed with round-half-up integer
/// arithmetic and clamped to 100; an all-empty total is reported as 100
/// instead of dividing by zero.
pub fn overall_progress<'a, I>(uploads: I) -> OverallProgress
where
    I: IntoIterator<Item = &'a Upload>,
{
    let mut is_any_pending = false;
    let mut total: u64 = 0;
    let mut uploaded: u64 = 0;

    for upload in uploads {
        if upload.status == UploadStatus::Progress {
            is_any_pending = true;
        }

        total += upload
            .compressed_size_in_bytes
            .unwrap_or(upload.original_size_in_bytes);

        if upload.compressed_size_in_bytes.is_some() {
            uploaded += upload.upload_size_in_bytes;
        }
    }

    if !is_any_pending || total == 0 {
        return OverallProgress {
            is_any_pending,
            percentage: 100,
        };
    }

    let percentage = ((uploaded * 100 + total / 2) / total).min(100) as u8;

    OverallProgress {
        is_any_pending,
        percentage,
    }
}
