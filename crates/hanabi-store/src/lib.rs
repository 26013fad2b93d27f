//! `RocksDB` storage layer for archived game tags.
//!
//! Once a game is archived as a replay its tags stop living on the in-memory
//! table and are kept here instead. This crate is the persistence
//! collaborator of the table layer: it knows nothing about locks or sessions.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `game_tags`: Tag records, keyed by `database_id || tag`
//! - `games_by_tag`: Index for finding every game carrying a tag
//!
//! # Example
//!
//! ```no_run
//! use hanabi_core::DatabaseId;
//! use hanabi_store::{RocksStore, TagStore};
//!
//! let store = RocksStore::open("/tmp/hanabi-db").unwrap();
//!
//! let game = DatabaseId::new(55);
//! store.insert_tag(game, "finesse").unwrap();
//! assert_eq!(store.get_all_tags(game).unwrap(), vec!["finesse".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use types::GameTag;

use hanabi_core::DatabaseId;

/// The storage trait defining all tag operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing). Each call is atomic on its own;
/// callers must not assume atomicity across calls.
pub trait TagStore: Send + Sync {
    /// Get every tag of a game, in key order.
    ///
    /// An unknown game has no tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_all_tags(&self, database_id: DatabaseId) -> Result<Vec<String>>;

    /// Attach a tag to a game.
    ///
    /// Inserting a tag that is already present overwrites its record. Tags
    /// must not contain NUL, which terminates the tag in the reverse index.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidTag` for a tag containing NUL, or an error
    /// if the database operation fails.
    fn insert_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()>;

    /// Remove a tag from a game.
    ///
    /// Removing an absent tag succeeds without effect, so a delete racing
    /// another delete of the same tag cannot fail or corrupt the indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()>;

    /// List every game carrying a tag, in ascending ID order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_tagged_games(&self, tag: &str) -> Result<Vec<DatabaseId>>;
}
