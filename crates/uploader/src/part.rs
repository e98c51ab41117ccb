//! Single-part upload: sign, PUT, collect the integrity token.

use std::sync::Arc;

use bytes::Bytes;
use parcel_protocol::constants::{DEFAULT_CONTENT_TYPE, HTTP_INSUFFICIENT_STORAGE};
use parcel_protocol::messages::SignedUrlRequest;
use parcel_transfer::ChunkReader;
use tracing::debug;

use crate::control::{ControlPlane, PutResponse, StorageBackend};
use crate::error::UploadError;
use crate::retry::RetryPolicy;
use crate::types::PartDescriptor;

/// Session coordinates every part upload is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTarget {
    pub key: String,
    pub upload_id: String,
    /// Content type sent with each PUT.
    pub content_type: String,
}

impl PartTarget {
    /// Falls back to `application/octet-stream` for an empty content type.
    pub fn new(key: String, upload_id: String, content_type: &str) -> Self {
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type.to_string()
        };
        Self {
            key,
            upload_id,
            content_type,
        }
    }
}

/// Strips the quotes storage backends put around ETags.
pub fn normalize_etag(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

/// Turns a raw PUT answer into an integrity token.
fn interpret_put(part_number: u32, resp: PutResponse) -> Result<String, UploadError> {
    if resp.status == HTTP_INSUFFICIENT_STORAGE {
        return Err(UploadError::StorageFull { part_number });
    }
    if !resp.is_success() {
        return Err(UploadError::ChunkUpload {
            part_number,
            status: Some(resp.status),
            reason: format!("status {}: {}", resp.status, resp.body),
        });
    }
    let token = resp.etag.as_deref().map(normalize_etag).unwrap_or_default();
    if token.is_empty() {
        return Err(UploadError::ChunkUpload {
            part_number,
            status: Some(resp.status),
            reason: "response carried no ETag header".into(),
        });
    }
    Ok(token)
}

/// Uploads individual parts of one session.
pub struct PartUploader {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn StorageBackend>,
    reader: ChunkReader,
    retry: RetryPolicy,
    target: PartTarget,
}

impl PartUploader {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn StorageBackend>,
        reader: ChunkReader,
        retry: RetryPolicy,
        target: PartTarget,
    ) -> Self {
        Self {
            control,
            storage,
            reader,
            retry,
            target,
        }
    }

    pub fn total_parts(&self) -> u32 {
        self.reader.plan().total_parts()
    }

    /// Size in bytes of part `part_number`, 0 when out of range.
    pub fn part_len(&self, part_number: u32) -> u64 {
        self.reader
            .plan()
            .boundary(part_number)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Uploads part `part_number`.
    ///
    /// Signing and the PUT are retried independently. The chunk is read once
    /// and reused across PUT attempts.
    pub async fn upload_part(&self, part_number: u32) -> Result<PartDescriptor, UploadError> {
        let reader = self.reader.clone();
        let chunk = tokio::task::spawn_blocking(move || reader.read_part(part_number))
            .await
            .map_err(|e| UploadError::Worker(format!("task join error: {e}")))??;

        let url = self.sign(part_number).await?;
        debug!(part = part_number, bytes = chunk.size(), "uploading chunk");

        let storage = &self.storage;
        let content_type = &self.target.content_type;
        let data = Bytes::from(chunk.data);
        let token = self
            .retry
            .run("put part", move || {
                let url = url.clone();
                let body = data.clone();
                let content_type = content_type.clone();
                async move {
                    let resp = storage
                        .put_part(url, body, content_type)
                        .await
                        .map_err(|e| UploadError::ChunkUpload {
                            part_number,
                            status: None,
                            reason: e.to_string(),
                        })?;
                    interpret_put(part_number, resp)
                }
            })
            .await?;

        debug!(part = part_number, etag = %token, "part uploaded");
        Ok(PartDescriptor {
            part_number,
            integrity_token: token,
        })
    }

    /// Obtains the signed URL for one part.
    async fn sign(&self, part_number: u32) -> Result<String, UploadError> {
        let control = &self.control;
        let target = &self.target;
        let resp = self
            .retry
            .run("sign part", move || {
                let req = SignedUrlRequest {
                    key: target.key.clone(),
                    upload_id: target.upload_id.clone(),
                    part_number,
                };
                async move {
                    control
                        .signed_url(req)
                        .await
                        .map_err(|cause| UploadError::Signing { part_number, cause })
                }
            })
            .await?;
        debug!(part = part_number, "got signed url");
        Ok(resp.signed_url)
    }
}
