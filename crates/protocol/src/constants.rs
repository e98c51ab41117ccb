use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default part size: 5 MiB, the smallest non-final part S3 accepts.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Content type sent with a part when the source's type is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Lifetime of a signed part URL issued by the control plane.
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// Status returned by the storage backend when it has run out of space.
pub const HTTP_INSUFFICIENT_STORAGE: u16 = 507;

/// Response header carrying the per-part integrity token.
pub const ETAG_HEADER: &str = "ETag";

/// REST prefix under which the control plane exposes its upload routes.
pub const ROUTE_PREFIX: &str = "/api/upload";

/// Control-plane operation identifier.
///
/// Serialises to the message-pattern `cmd` used by the RPC transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "initiate_upload")]
    Initiate,
    #[serde(rename = "get_signed_url")]
    SignUrl,
    #[serde(rename = "complete_upload")]
    Complete,
    #[serde(rename = "abort_upload")]
    Abort,
}

impl Command {
    /// REST route (relative to the server base URL) for this command.
    pub fn route(self) -> &'static str {
        match self {
            Command::Initiate => "/api/upload/initiate",
            Command::SignUrl => "/api/upload/url",
            Command::Complete => "/api/upload/complete",
            Command::Abort => "/api/upload/abort",
        }
    }

    /// Message pattern understood by the RPC transport: `{"cmd": "<name>"}`.
    pub fn pattern(self) -> serde_json::Value {
        serde_json::json!({ "cmd": self })
    }

    /// Short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Initiate => "initiate",
            Command::SignUrl => "sign part",
            Command::Complete => "complete",
            Command::Abort => "abort",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
