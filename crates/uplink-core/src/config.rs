//! Compression configuration.

/// Configuration for the image compression stage.
///
/// Dimensions are upper bounds: images larger than the configured box are
/// downscaled to fit while preserving aspect ratio, never upscaled. `None`
/// leaves the corresponding side unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionConfig {
    /// Maximum output width in pixels, unbounded when `None`.
    pub max_width: Option<u32>,
    /// Maximum output height in pixels, unbounded when `None`.
    pub max_height: Option<u32>,
    /// Encoder quality in `0.0..=1.0`. Values outside the range are clamped.
    pub quality: f32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            quality: 1.0,
        }
    }
}

impl CompressionConfig {
    /// Bounded config with the same limit on both sides.
    pub fn bounded(max_side: u32, quality: f32) -> Self {
        Self {
            max_width: Some(max_side),
            max_height: Some(max_side),
            quality,
        }
    }
}
