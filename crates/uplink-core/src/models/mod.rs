pub mod upload;

pub use upload::{SourceFile, Upload, UploadPatch, UploadStatus};
