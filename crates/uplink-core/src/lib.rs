//! Uplink Core Library
//!
//! This crate provides the core domain models and configuration that are
//! shared across all Uplink components.

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::CompressionConfig;
pub use models::{SourceFile, Upload, UploadPatch, UploadStatus};
