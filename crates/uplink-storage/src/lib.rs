//! Storage transfer stage.
//!
//! Defines the [`StorageClient`] trait that transfer backends implement and
//! the HTTP multipart backend used against the storage endpoint. Transfers
//! report cumulative byte progress and observe a per-attempt cancellation
//! token, resolving with a distinguished `Cancelled` outcome when triggered.

pub mod http;
pub mod traits;

pub use http::HttpStorageClient;
pub use traits::{ProgressCallback, StorageClient, TransferError, TransferResult};
