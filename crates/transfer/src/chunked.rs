use std::sync::Arc;

use crate::source::ChunkSource;
use crate::types::{Chunk, ChunkBoundary};
use crate::TransferError;

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Part layout for a source of a known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    total_parts: u32,
}

impl ChunkPlan {
    /// Lays out `total_size` bytes in parts of `chunk_size`.
    ///
    /// Zero-length sources and a zero chunk size are rejected.
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        if total_size == 0 {
            return Err(TransferError::EmptySource);
        }
        let total_parts = u32::try_from(total_size.div_ceil(chunk_size)).map_err(|_| {
            TransferError::TooManyParts {
                total_size,
                max: u32::MAX,
            }
        })?;
        Ok(Self {
            total_size,
            chunk_size,
            total_parts,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    /// Boundary of part `part_number` (1-based).
    pub fn boundary(&self, part_number: u32) -> Result<ChunkBoundary, TransferError> {
        if part_number == 0 || part_number > self.total_parts {
            return Err(TransferError::PartOutOfRange {
                part_number,
                total_parts: self.total_parts,
            });
        }
        let start = u64::from(part_number - 1) * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_size);
        Ok(ChunkBoundary {
            part_number,
            start,
            end,
        })
    }

    /// All boundaries in ascending part order.
    pub fn boundaries(&self) -> impl Iterator<Item = ChunkBoundary> + '_ {
        (1..=self.total_parts).map(move |n| {
            let start = u64::from(n - 1) * self.chunk_size;
            ChunkBoundary {
                part_number: n,
                start,
                end: (start + self.chunk_size).min(self.total_size),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads the parts of a [`ChunkPlan`] from a shared source.
///
/// Reads are blocking; async callers should run them on the blocking pool.
#[derive(Clone)]
pub struct ChunkReader {
    source: Arc<dyn ChunkSource>,
    plan: ChunkPlan,
}

impl ChunkReader {
    /// Plans `source` with the given chunk size.
    pub fn new(source: Arc<dyn ChunkSource>, chunk_size: u64) -> Result<Self, TransferError> {
        let plan = ChunkPlan::new(source.len(), chunk_size)?;
        Ok(Self { source, plan })
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Reads the bytes of part `part_number`.
    pub fn read_part(&self, part_number: u32) -> Result<Chunk, TransferError> {
        let boundary = self.plan.boundary(part_number)?;
        let len = usize::try_from(boundary.len())
            .map_err(|_| std::io::Error::other("part does not fit in memory"))?;
        let mut data = vec![0u8; len];
        self.source.read_exact_at(boundary.start, &mut data)?;
        Ok(Chunk {
            part_number,
            offset: boundary.start,
            data,
        })
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}
