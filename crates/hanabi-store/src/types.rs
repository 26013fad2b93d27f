//! Domain types stored in the database.

use chrono::{DateTime, Utc};
use hanabi_core::DatabaseId;
use serde::{Deserialize, Serialize};

/// A tag attached to an archived game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTag {
    /// The game the tag belongs to.
    pub database_id: DatabaseId,
    /// Normalized tag text, unique within the game.
    pub tag: String,
    /// When the tag was persisted.
    pub created_at: DateTime<Utc>,
}

impl GameTag {
    /// Create a tag record stamped with the current time.
    #[must_use]
    pub fn new(database_id: DatabaseId, tag: impl Into<String>) -> Self {
        Self {
            database_id,
            tag: tag.into(),
            created_at: Utc::now(),
        }
    }
}
