//! The dual-backend tag store.
//!
//! While a game is live its tags are a map on the table itself; once it is
//! archived they live in the persisted store under the game's database ID.
//! Exactly one backend is authoritative for a table at any time, and
//! `TagBackend` is that choice.
//!
//! # Races
//!
//! The persisted path is fetch-then-mutate across two store calls. The table
//! lock serializes commands on this server, but another writer to the same
//! game record could interleave. The store's delete and insert are
//! idempotent, so the worst case is a redundant write, never corruption.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hanabi_core::{DatabaseId, UserId};
use hanabi_store::TagStore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Who added an in-memory tag and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMeta {
    /// The user who added the tag.
    pub user_id: UserId,
    /// When the tag was added.
    pub created_at: DateTime<Utc>,
}

impl TagMeta {
    /// Metadata for a tag added now by `user_id`.
    #[must_use]
    pub fn now(user_id: UserId) -> Self {
        Self {
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Where a table's tags currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagBackend {
    /// The game is live: tags are held on the table.
    InMemory(BTreeMap<String, TagMeta>),
    /// The game is a replay: tags are persisted under this game ID.
    Persisted(DatabaseId),
}

/// Result of a tag deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The tag existed and was removed.
    Deleted,
    /// The tag was not present; nothing changed.
    NotFound,
}

/// Result of a tag insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The tag was added.
    Added,
    /// The tag was already present; nothing changed.
    Duplicate,
}

impl Default for TagBackend {
    fn default() -> Self {
        Self::InMemory(BTreeMap::new())
    }
}

impl TagBackend {
    /// Returns true if tags are read from and written to the persisted store.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }

    /// Remove `tag`.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Storage` if a persisted read or delete fails. In
    /// that case the persisted record is left as it was.
    pub fn delete<S: TagStore + ?Sized>(&mut self, store: &S, tag: &str) -> Result<Deletion> {
        match self {
            Self::InMemory(tags) => Ok(match tags.remove(tag) {
                Some(_) => Deletion::Deleted,
                None => Deletion::NotFound,
            }),
            Self::Persisted(database_id) => {
                let database_id = *database_id;
                let tags = fetch(store, database_id)?;
                if !tags.iter().any(|t| t == tag) {
                    return Ok(Deletion::NotFound);
                }

                store
                    .delete_tag(database_id, tag)
                    .map_err(|source| TableError::Storage {
                        database_id,
                        operation: "delete a tag",
                        source,
                    })?;
                Ok(Deletion::Deleted)
            }
        }
    }

    /// Add `tag`, recording `user_id` as its author while the game is live.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Storage` if a persisted read or insert fails.
    pub fn insert<S: TagStore + ?Sized>(
        &mut self,
        store: &S,
        tag: &str,
        user_id: UserId,
    ) -> Result<Insertion> {
        match self {
            Self::InMemory(tags) => {
                if tags.contains_key(tag) {
                    return Ok(Insertion::Duplicate);
                }
                tags.insert(tag.to_string(), TagMeta::now(user_id));
                Ok(Insertion::Added)
            }
            Self::Persisted(database_id) => {
                let database_id = *database_id;
                let tags = fetch(store, database_id)?;
                if tags.iter().any(|t| t == tag) {
                    return Ok(Insertion::Duplicate);
                }

                store
                    .insert_tag(database_id, tag)
                    .map_err(|source| TableError::Storage {
                        database_id,
                        operation: "insert a tag",
                        source,
                    })?;
                Ok(Insertion::Added)
            }
        }
    }

    /// List the tags of the authoritative backend, in order.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Storage` if the persisted read fails.
    pub fn list<S: TagStore + ?Sized>(&self, store: &S) -> Result<Vec<String>> {
        match self {
            Self::InMemory(tags) => Ok(tags.keys().cloned().collect()),
            Self::Persisted(database_id) => fetch(store, *database_id),
        }
    }
}

fn fetch<S: TagStore + ?Sized>(store: &S, database_id: DatabaseId) -> Result<Vec<String>> {
    store
        .get_all_tags(database_id)
        .map_err(|source| TableError::Storage {
            database_id,
            operation: "get the tags",
            source,
        })
}
