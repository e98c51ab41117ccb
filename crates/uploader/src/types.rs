//! Data types for the upload flow.

use std::time::Duration;

use parcel_protocol::UploadStatus;
use parcel_protocol::messages::{CompleteResponse, CompletedPart};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::UploadError;

/// One successfully uploaded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based part number.
    pub part_number: u32,
    /// Storage integrity token (ETag) with quotes stripped.
    pub integrity_token: String,
}

impl From<PartDescriptor> for CompletedPart {
    fn from(p: PartDescriptor) -> Self {
        CompletedPart {
            part_number: p.part_number,
            etag: p.integrity_token,
        }
    }
}

/// The in-progress multipart upload as tracked by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Opaque id issued by the control plane (`uploadId` on the wire).
    pub session_id: String,
    /// Destination key (`key` on the wire).
    pub object_key: String,
    pub total_parts: u32,
    pub parts_completed: u32,
    pub status: UploadStatus,
}

/// Event emitted while an upload runs.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// The controller moved to a new state.
    StatusChanged { status: UploadStatus },
    /// The control plane opened a session.
    Initiated {
        upload_id: String,
        key: String,
        total_parts: u32,
    },
    /// One part reached the storage backend.
    PartUploaded { part_number: u32, bytes: u64 },
    /// Aggregate progress after a part completed.
    Progress {
        parts_completed: u32,
        total_parts: u32,
        percent: u8,
        bytes_uploaded: u64,
        total_bytes: u64,
        bytes_per_second: f64,
        /// Remaining time at the current throughput, once it is known.
        eta: Option<Duration>,
    },
    /// The object was finalized.
    Completed { location: String },
    /// The upload failed; an abort may follow.
    Failed { error: UploadError },
    /// Cleanup of a failed session was attempted.
    Aborted {
        upload_id: String,
        key: String,
        success: bool,
    },
}

/// Capacity of the channel returned by `UploadController::take_events`.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Sends an event, waiting while the consumer is behind.
///
/// Events are discarded only when no receiver is listening.
pub(crate) async fn emit(events: &mpsc::Sender<UploadEvent>, event: UploadEvent) {
    if events.send(event).await.is_err() {
        trace!("no event receiver, event discarded");
    }
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub location: String,
    pub bucket: String,
    pub key: String,
    pub etag: String,
    pub total_parts: u32,
    pub total_bytes: u64,
}

impl UploadOutcome {
    pub(crate) fn new(resp: CompleteResponse, total_parts: u32, total_bytes: u64) -> Self {
        Self {
            location: resp.location,
            bucket: resp.bucket,
            key: resp.key,
            etag: resp.etag,
            total_parts,
            total_bytes,
        }
    }
}
