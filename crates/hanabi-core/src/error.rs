//! Error types shared across the hanabi table server crates.

use thiserror::Error;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input is not a non-negative integer.
    #[error("invalid numeric identifier: {0:?}")]
    InvalidNumber(String),
}
