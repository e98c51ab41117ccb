//! Uploader configuration.

use std::time::Duration;

use parcel_protocol::constants::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::retry::RetryPolicy;

/// Tunables for one upload controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Part size in bytes (every part but the last).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Maximum part uploads in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Attempts per remote call, including the first.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_concurrency() -> usize {
    3
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_concurrency: default_max_concurrency(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl UploaderConfig {
    /// Rejects values the upload cannot run with.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::Config("chunk_size must be > 0".into()));
        }
        if self.max_concurrency == 0 {
            return Err(UploadError::Config("max_concurrency must be > 0".into()));
        }
        Ok(())
    }

    /// Retry policy derived from this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
