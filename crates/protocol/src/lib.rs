pub mod constants;
pub mod keys;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::Command;
pub use keys::format_object_key;
pub use messages::{
    AbortRequest, AbortResponse, CompleteRequest, CompleteResponse, CompletedPart,
    InitiateRequest, InitiateResponse, SignedUrlRequest, SignedUrlResponse,
};
pub use types::{UploadDetails, UploadStatus};
