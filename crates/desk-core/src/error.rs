//! Error types for desk-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid order ticket: {0}")]
    InvalidTicket(String),

    #[error("Invalid trading signal: {0}")]
    InvalidSignal(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
