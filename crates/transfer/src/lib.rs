//! Part planning and chunk reading for multipart uploads.
//!
//! A source of `N` bytes is split into `ceil(N / chunk_size)` parts, numbered
//! from 1. Every part except the last is exactly `chunk_size` bytes.

mod chunked;
mod progress;
mod source;
mod types;

pub use chunked::{ChunkPlan, ChunkReader};
pub use progress::{ProgressMeter, progress_percent};
pub use source::{ChunkSource, FileSource, MemorySource};
pub use types::{Chunk, ChunkBoundary};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source is empty")]
    EmptySource,

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("part {part_number} out of range (1..={total_parts})")]
    PartOutOfRange { part_number: u32, total_parts: u32 },

    #[error("source of {total_size} bytes needs more than {max} parts")]
    TooManyParts { total_size: u64, max: u32 },
}
