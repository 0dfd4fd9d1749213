use bytes::Bytes;
use image::{imageops::FilterType, GenericImageView, ImageReader};
use std::io::Cursor;
use uplink_core::CompressionConfig;

/// Input content types the compressor accepts.
pub const ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Content type of every compressed artifact.
pub const OUTPUT_CONTENT_TYPE: &str = "image/webp";

const OUTPUT_EXTENSION: &str = "webp";

/// Compression stage errors. All are terminal for the current attempt.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode compressed image")]
    EncodingFailed,
}

/// Result of a successful compression.
#[derive(Clone, Debug)]
pub struct CompressedArtifact {
    /// Original filename with its extension replaced by `.webp`.
    pub filename: String,
    pub content_type: &'static str,
    pub data: Bytes,
}

impl CompressedArtifact {
    pub fn size_in_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// WebP re-encoder with downscale-only resizing.
pub struct ImageCompressor;

impl ImageCompressor {
    /// Compress `data` into a WebP artifact.
    ///
    /// Validates the content type against [`ALLOWED_CONTENT_TYPES`] before
    /// touching the bytes, downscales to fit the configured bounds, and
    /// re-encodes at the configured quality.
    pub fn compress(
        name: &str,
        content_type: &str,
        data: &[u8],
        config: &CompressionConfig,
    ) -> Result<CompressedArtifact, CompressionError> {
        let normalized = content_type.to_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&normalized.as_str()) {
            return Err(CompressionError::UnsupportedFormat(
                content_type.to_string(),
            ));
        }

        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CompressionError::DecodeFailed(e.to_string()))?
            .decode()
            .map_err(|e| CompressionError::DecodeFailed(e.to_string()))?;

        let (width, height) = img.dimensions();
        let (target_width, target_height) =
            fit_within(width, height, config.max_width, config.max_height);

        let resized = if (target_width, target_height) == (width, height) {
            img
        } else {
            tracing::debug!(
                width = width,
                height = height,
                target_width = target_width,
                target_height = target_height,
                "Downscaling image to fit bounds"
            );
            img.resize_exact(target_width, target_height, FilterType::Lanczos3)
        };

        let rgba = resized.to_rgba8();
        let encoder = webp::Encoder::from_rgba(&rgba, target_width, target_height);
        let quality = config.quality.clamp(0.0, 1.0) * 100.0;
        let encoded = encoder.encode(quality);

        if encoded.is_empty() {
            return Err(CompressionError::EncodingFailed);
        }

        Ok(CompressedArtifact {
            filename: webp_filename(name),
            content_type: OUTPUT_CONTENT_TYPE,
            data: Bytes::copy_from_slice(&encoded),
        })
    }
}

/// Compress on the blocking thread pool.
///
/// Decode and encode are CPU-bound; this keeps them off the async workers.
pub async fn compress_image(
    name: String,
    content_type: String,
    data: Bytes,
    config: CompressionConfig,
) -> Result<CompressedArtifact, CompressionError> {
    match tokio::task::spawn_blocking(move || {
        ImageCompressor::compress(&name, &content_type, &data, &config)
    })
    .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Compression task failed");
            Err(CompressionError::EncodingFailed)
        }
    }
}

/// Target dimensions fitting `width`x`height` inside the configured bounds.
///
/// The side whose scale factor is binding is clamped to its max; images
/// already within bounds are returned unchanged (no upscaling).
fn fit_within(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let mut scale = 1.0_f64;
    if let Some(max_w) = max_width {
        if width > max_w {
            scale = scale.min(max_w as f64 / width as f64);
        }
    }
    if let Some(max_h) = max_height {
        if height > max_h {
            scale = scale.min(max_h as f64 / height as f64);
        }
    }

    if scale >= 1.0 {
        return (width, height);
    }

    let target_width = ((width as f64 * scale).round() as u32).max(1);
    let target_height = ((height as f64 * scale).round() as u32).max(1);
    (target_width, target_height)
}

/// Replace the filename extension with `.webp`, appending when there is none.
fn webp_filename(name: &str) -> String {
    match name.rfind('.') {
        Some(index) => format!("{}.{}", &name[..index], OUTPUT_EXTENSION),
        None => format!("{}.{}", name, OUTPUT_EXTENSION),
    }
}
