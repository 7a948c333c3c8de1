//! Chunk sizing policy
//!
//! Extraction chunks (one source round trip) and load batches (one insert
//! statement) are sized on different scales: a chunk costs one round trip
//! regardless of width, while a load batch must stay small enough to commit
//! atomically within a reasonable window. The tiers below are fixed policy;
//! the size is chosen once per task and never changes mid-task.

use serde::{Deserialize, Serialize};

use crate::source::RawRecord;

/// Extraction chunk size for unknown or small sources (<= 100k rows).
pub const CHUNK_SIZE_SMALL: usize = 50_000;

/// Extraction chunk size for medium sources (100k to 1M rows).
pub const CHUNK_SIZE_MEDIUM: usize = 100_000;

/// Extraction chunk size for large sources (> 1M rows).
pub const CHUNK_SIZE_LARGE: usize = 200_000;

/// Load batch size for one insert statement.
pub const LOAD_BATCH_SIZE: usize = 1_000;

/// Load batch size for large tables, amortizing per-statement overhead.
pub const LOAD_BATCH_SIZE_LARGE: usize = 10_000;

/// Row-count threshold above which a source counts as large.
pub const LARGE_TABLE_ROWS: i64 = 1_000_000;

/// An ordered slice of a source's rows read in one round trip.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of the first record within the source.
    pub offset: i64,
    pub records: Vec<RawRecord>,
}

impl Chunk {
    pub fn new(offset: i64, records: Vec<RawRecord>) -> Self {
        Self { offset, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Chunk/batch sizing decided once per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunk_size: usize,
    /// Ceil(total / chunk_size); 0 when the total is unknown.
    pub estimated_chunks: usize,
    pub load_batch_size: usize,
}

/// Pick chunk and load-batch sizes from an estimated total row count.
///
/// `estimated_rows` of 0 means the count is unknown (API pages, files before
/// download); those sources get the small tier.
pub fn plan_chunks(estimated_rows: i64) -> ChunkPlan {
    let chunk_size = if estimated_rows > LARGE_TABLE_ROWS {
        CHUNK_SIZE_LARGE
    } else if estimated_rows > 100_000 {
        CHUNK_SIZE_MEDIUM
    } else {
        CHUNK_SIZE_SMALL
    };

    let load_batch_size = if estimated_rows > LARGE_TABLE_ROWS {
        LOAD_BATCH_SIZE_LARGE
    } else {
        LOAD_BATCH_SIZE
    };

    let estimated_chunks = if estimated_rows > 0 {
        (estimated_rows as usize).div_ceil(chunk_size)
    } else {
        0
    };

    ChunkPlan {
        chunk_size,
        estimated_chunks,
        load_batch_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_count_gets_small_tier() {
        let plan = plan_chunks(0);
        assert_eq!(plan.chunk_size, CHUNK_SIZE_SMALL);
        assert_eq!(plan.estimated_chunks, 0);
        assert_eq!(plan.load_batch_size, LOAD_BATCH_SIZE);
    }

    #[test]
    fn test_small_source_tier() {
        let plan = plan_chunks(100_000);
        assert_eq!(plan.chunk_size, CHUNK_SIZE_SMALL);
        assert_eq!(plan.estimated_chunks, 2);
    }

    #[test]
    fn test_medium_source_tier() {
        let plan = plan_chunks(250_000);
        assert_eq!(plan.chunk_size, CHUNK_SIZE_MEDIUM);
        assert_eq!(plan.estimated_chunks, 3);
        assert_eq!(plan.load_batch_size, LOAD_BATCH_SIZE);
    }

    #[test]
    fn test_large_source_tier() {
        let plan = plan_chunks(1_000_001);
        assert_eq!(plan.chunk_size, CHUNK_SIZE_LARGE);
        assert_eq!(plan.estimated_chunks, 6);
        assert_eq!(plan.load_batch_size, LOAD_BATCH_SIZE_LARGE);
    }

    #[test]
    fn test_boundary_at_one_million_is_medium() {
        let plan = plan_chunks(1_000_000);
        assert_eq!(plan.chunk_size, CHUNK_SIZE_MEDIUM);
        assert_eq!(plan.estimated_chunks, 10);
        assert_eq!(plan.load_batch_size, LOAD_BATCH_SIZE);
    }

    #[test]
    fn test_chunk_len() {
        let chunk = Chunk::new(0, Vec::new());
        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }
}
