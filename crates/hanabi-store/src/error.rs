//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The tag cannot be stored as a key.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    /// The call was cancelled or timed out before the backend answered.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
