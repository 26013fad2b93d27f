//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Game tag records, keyed by `database_id || tag`.
    pub const GAME_TAGS: &str = "game_tags";

    /// Index: games by tag, keyed by `tag || 0x00 || database_id`.
    pub const GAMES_BY_TAG: &str = "games_by_tag";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::GAME_TAGS, cf::GAMES_BY_TAG]
}
