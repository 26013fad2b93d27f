//! Error types for the table layer.
//!
//! Command handlers never return these to their callers. They are produced by
//! the tag and archival operations and turned into a session message and/or a
//! log event at the handler boundary.

use hanabi_core::{DatabaseId, TableId};
use hanabi_store::StoreError;
use thiserror::Error;

use crate::sanitize::SanitizeError;

/// A result type using `TableError`.
pub type Result<T> = std::result::Result<T, TableError>;

/// The message shown to users for any infrastructure failure.
///
/// The underlying cause is only ever logged.
pub const DEFAULT_ERROR_MSG: &str = "Something went wrong. Please contact an administrator.";

/// Errors that can occur in table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// The requested table is not in the registry.
    #[error("table not found: {0}")]
    TableNotFound(TableId),

    /// A table with this ID is already registered.
    #[error("table already exists: {0}")]
    TableExists(TableId),

    /// The game has not started and is not a replay.
    #[error("table {0} has not started")]
    NotStarted(TableId),

    /// The table has already been archived.
    #[error("table {0} is already a replay")]
    AlreadyReplay(TableId),

    /// Free-text input was rejected by the sanitizer.
    #[error(transparent)]
    Validation(#[from] SanitizeError),

    /// A persisted-storage call failed.
    #[error("failed to {operation} for game {database_id}: {source}")]
    Storage {
        /// The game whose record was being accessed.
        database_id: DatabaseId,
        /// What was being attempted (e.g. "get the tags").
        operation: &'static str,
        /// The underlying storage error.
        #[source]
        source: StoreError,
    },

    /// The configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TableError {
    /// Returns the text shown to the user who issued the command.
    ///
    /// Storage failures never echo their cause.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TableNotFound(table_id) => format!("Table {table_id} does not exist."),
            Self::TableExists(table_id) => format!("Table {table_id} already exists."),
            Self::NotStarted(_) => NOT_STARTED_FAIL.to_string(),
            Self::AlreadyReplay(_) => "This game has already been archived.".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::Storage { .. } | Self::Config(_) => DEFAULT_ERROR_MSG.to_string(),
        }
    }

    /// Returns true if this error indicates a system fault rather than a user mistake.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Config(_))
    }
}

/// The warning sent when a command needs a started game.
pub const NOT_STARTED_FAIL: &str = "The game for this table has not started yet.";
