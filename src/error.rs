//! Error types for sendr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in sendr
#[derive(Debug, Error)]
pub enum SendrError {
    /// Required input file or field is missing
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Credentials could not be resolved
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Recipient list could not be parsed
    #[error("Batch error: {0}")]
    Batch(String),

    /// Delivery channel fault (session, transport, page structure)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Status store persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for sendr operations
pub type Result<T> = std::result::Result<T, SendrError>;
