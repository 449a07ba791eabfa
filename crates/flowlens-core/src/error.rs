//! Error types for flowlens

use thiserror::Error;

/// Core error type for flowlens operations
#[derive(Error, Debug)]
pub enum FlowlensError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for flowlens operations
pub type Result<T> = std::result::Result<T, FlowlensError>;
