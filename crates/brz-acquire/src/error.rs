//! Error taxonomy for the acquisition engine
//!
//! Task-level failures (`Connect`, `Read`, `SchemaMismatch`, `TextualInsert`,
//! `Deadline`) are caught at the task boundary and folded into the job
//! result; they never abort sibling tasks. `NativeInsert` is recoverable and
//! is consumed inside the batch loader by the textual fallback. `Config`
//! surfaces to the caller before any task starts.

use thiserror::Error;

/// Result type alias for acquisition operations
pub type AcquireResult<T> = std::result::Result<T, AcquireError>;

/// Errors produced by the acquisition engine
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Failed to connect to source: {0}")]
    Connect(String),

    #[error("Read failed mid-extraction: {0}")]
    Read(String),

    #[error("Schema mismatch: column '{column}' not in the contract of table '{table}'")]
    SchemaMismatch { table: String, column: String },

    #[error("Native bulk insert failed: {0}")]
    NativeInsert(String),

    #[error("Textual insert failed: {0}")]
    TextualInsert(String),

    #[error("Task deadline of {0}s elapsed")]
    Deadline(u64),

    #[error("Invalid job request: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BRZ error: {0}")]
    Common(#[from] brz_common::BrzError),
}

impl AcquireError {
    /// Whether the batch loader may recover from this error by retrying the
    /// batch through the textual insert path.
    pub fn is_recoverable_load(&self) -> bool {
        matches!(self, AcquireError::NativeInsert(_))
    }
}
