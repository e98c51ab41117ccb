//! Chunked multipart upload client.
//!
//! This crate holds the upload logic with no transport of its own: callers
//! provide a [`ControlPlane`] (opens, signs, finalizes and aborts sessions)
//! and a [`StorageBackend`] (receives part bytes through signed URLs).
//!
//! # Flow
//!
//! 1. **Select** a non-empty source
//! 2. **Initiate** a session on the control plane
//! 3. **Upload** parts through a bounded worker pool, retrying each call
//! 4. **Complete** with the sorted part list, or **abort** on failure

pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod part;
pub mod retry;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod mock;

pub use config::UploaderConfig;
pub use control::{ControlPlane, PutResponse, StorageBackend, TransportFuture};
pub use controller::{SelectedFile, UploadController};
pub use error::{TransportError, UploadError};
pub use part::{PartTarget, PartUploader, normalize_etag};
pub use retry::{RetryPolicy, Retryable};
pub use scheduler::{PartScheduler, order_parts};
pub use types::{PartDescriptor, UploadEvent, UploadOutcome, UploadSession};
