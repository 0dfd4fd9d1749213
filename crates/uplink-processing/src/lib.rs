//! Image compression stage.
//!
//! Re-encodes submitted images into WebP, downscaling to configured bounds
//! while preserving aspect ratio. The stage is a pure transform: callers see
//! either a completed artifact or an error, never partial state.

pub mod compress;

pub use compress::{
    compress_image, CompressedArtifact, CompressionError, ImageCompressor, OUTPUT_CONTENT_TYPE,
};
