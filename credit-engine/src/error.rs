//! Error types for the credit engine

use thiserror::Error;
use uuid::Uuid;

/// Result type for credit engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Credit engine errors
#[derive(Debug, Error)]
pub enum Error {
    /// Customer id could not be resolved
    #[error("Customer not found: {0}")]
    NotFound(Uuid),

    /// Underlying read or write failed (network, store, timeout)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Invalid input to a write operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Whether a caller may reasonably retry the same call
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::DataAccess(_))
    }
}
