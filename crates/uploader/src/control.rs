//! Collaborator traits: the control plane and the storage backend.
//!
//! The CLI wires these to HTTP (`parcel-http`); tests use in-memory mocks.
//! Keeping them as traits decouples the upload logic from any transport.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use parcel_protocol::messages::{
    AbortRequest, AbortResponse, CompleteRequest, CompleteResponse, InitiateRequest,
    InitiateResponse, SignedUrlRequest, SignedUrlResponse,
};

use crate::error::TransportError;

/// Boxed future returned by collaborator calls.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Service that opens, signs, finalizes and aborts multipart sessions.
pub trait ControlPlane: Send + Sync {
    /// Opens a session for one object.
    fn initiate(&self, req: InitiateRequest) -> TransportFuture<'_, InitiateResponse>;

    /// Issues a time-limited URL for uploading one part.
    fn signed_url(&self, req: SignedUrlRequest) -> TransportFuture<'_, SignedUrlResponse>;

    /// Finalizes the object from an ascending, gapless part list.
    fn complete(&self, req: CompleteRequest) -> TransportFuture<'_, CompleteResponse>;

    /// Discards the session and its stored parts.
    fn abort(&self, req: AbortRequest) -> TransportFuture<'_, AbortResponse>;
}

/// Raw answer to a part PUT.
///
/// Interpreted by the part uploader so every backend gets the same status
/// handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    pub status: u16,
    /// `ETag` header as sent by the backend (possibly quoted).
    pub etag: Option<String>,
    /// Response text, kept for error messages.
    pub body: String,
}

impl PutResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Object store reached directly through signed URLs.
pub trait StorageBackend: Send + Sync {
    /// PUTs `body` to `url` with the given `Content-Type`.
    ///
    /// Errors are reserved for transport failures; HTTP error statuses come
    /// back as a [`PutResponse`].
    fn put_part(
        &self,
        url: String,
        body: Bytes,
        content_type: String,
    ) -> TransportFuture<'_, PutResponse>;
}
