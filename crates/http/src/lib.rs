//! HTTP transport for parcel uploads.
//!
//! [`HttpControlPlane`] speaks JSON to the upload server and
//! [`HttpStorage`] PUTs part bytes to the signed URLs it hands out. Both
//! plug into [`parcel_uploader::UploadController`].

mod control;
mod storage;

#[cfg(test)]
mod test_server;

pub use control::HttpControlPlane;
pub use storage::HttpStorage;

use parcel_uploader::TransportError;

/// Errors from the HTTP transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl From<Error> for TransportError {
    fn from(e: Error) -> Self {
        match e {
            Error::Http(e) => TransportError::Request(e.to_string()),
            Error::Api { status, body } => TransportError::Status { status, body },
            Error::Json(e) => TransportError::InvalidResponse(e.to_string()),
            Error::InvalidUrl(url) => TransportError::Request(format!("invalid URL: {url}")),
        }
    }
}
