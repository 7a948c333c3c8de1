//! Error types for BRZ

use thiserror::Error;

/// Result type alias for BRZ operations
pub type Result<T> = std::result::Result<T, BrzError>;

/// Main error type for BRZ
#[derive(Error, Debug)]
pub enum BrzError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
