/// Byte range `[start, end)` of one part within its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkBoundary {
    /// 1-based part number.
    pub part_number: u32,
    /// Offset of the first byte.
    pub start: u64,
    /// Offset one past the last byte.
    pub end: u64,
}

impl ChunkBoundary {
    /// Number of bytes in this part.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always `false` for boundaries produced by a [`ChunkPlan`](crate::ChunkPlan).
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// The bytes of one part, read from a source.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based part number.
    pub part_number: u32,
    /// Byte offset within the source.
    pub offset: u64,
    /// Raw part data.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Size of this chunk in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
