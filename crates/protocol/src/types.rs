use serde::{Deserialize, Serialize};

/// Lifecycle state of an upload as seen by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// No file selected.
    #[default]
    Idle,
    /// File selected, upload not started.
    Ready,
    /// Session open, parts in flight.
    Uploading,
    /// Object finalized by the control plane.
    Complete,
    /// Upload failed (and was aborted when a session existed).
    Error,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Ready => "ready",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Complete => "complete",
            UploadStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an upload for display purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDetails {
    pub upload_id: Option<String>,
    pub key: Option<String>,
    pub parts_uploaded: u32,
    pub total_parts: u32,
}
