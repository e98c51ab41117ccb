//! Upload error types.

use parcel_protocol::UploadStatus;
use parcel_transfer::TransferError;

/// Failure reported by a control-plane or storage transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors produced by an upload.
///
/// `Clone` so the controller can keep the last failure inspectable after
/// returning it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("failed to initiate upload: {0}")]
    Initiation(TransportError),

    #[error("failed to sign part {part_number}: {cause}")]
    Signing {
        part_number: u32,
        cause: TransportError,
    },

    #[error("chunk upload failed for part {part_number}: {reason}")]
    ChunkUpload {
        part_number: u32,
        /// HTTP status, when the backend answered at all.
        status: Option<u16>,
        reason: String,
    },

    #[error("storage full: backend has insufficient storage space (part {part_number})")]
    StorageFull { part_number: u32 },

    #[error("failed to complete upload: {0}")]
    Finalization(TransportError),

    #[error("failed to abort upload: {0}")]
    Abort(TransportError),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: UploadStatus,
    },

    #[error("source is empty")]
    EmptySource,

    #[error("part list incomplete: {0}")]
    IncompleteParts(String),

    #[error("source read failed: {0}")]
    Source(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("part worker failed: {0}")]
    Worker(String),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Returns `true` when the storage backend reported HTTP 507.
    pub fn is_storage_full(&self) -> bool {
        matches!(self, UploadError::StorageFull { .. })
    }

    /// Returns `true` for failures worth another attempt.
    ///
    /// A full backend, a cancellation and caller mistakes fail fast.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            UploadError::StorageFull { .. }
                | UploadError::Cancelled
                | UploadError::InvalidState { .. }
                | UploadError::EmptySource
                | UploadError::IncompleteParts(_)
                | UploadError::Config(_)
        )
    }
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::EmptySource => UploadError::EmptySource,
            TransferError::InvalidChunkSize => UploadError::Config(e.to_string()),
            other => UploadError::Source(other.to_string()),
        }
    }
}
