//! In-process storage implementation.
//!
//! `MemoryStore` keeps tag records in an ordered map so it answers every query
//! in the same order as `RocksStore`. It backs tests and development runs that
//! have no data directory.

use std::collections::BTreeMap;

use hanabi_core::DatabaseId;
use parking_lot::RwLock;

use crate::error::Result;
use crate::keys;
use crate::types::GameTag;
use crate::TagStore;

/// A volatile tag store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tags: RwLock<BTreeMap<(DatabaseId, String), GameTag>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored tags across all games.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.read().len()
    }

    /// Check if the store holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.read().is_empty()
    }
}

impl TagStore for MemoryStore {
    fn get_all_tags(&self, database_id: DatabaseId) -> Result<Vec<String>> {
        Ok(self
            .tags
            .read()
            .keys()
            .filter(|(id, _)| *id == database_id)
            .map(|(_, tag)| tag.clone())
            .collect())
    }

    fn insert_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()> {
        keys::check_tag(tag)?;
        self.tags.write().insert(
            (database_id, tag.to_string()),
            GameTag::new(database_id, tag),
        );
        Ok(())
    }

    fn delete_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()> {
        self.tags.write().remove(&(database_id, tag.to_string()));
        Ok(())
    }

    fn list_tagged_games(&self, tag: &str) -> Result<Vec<DatabaseId>> {
        Ok(self
            .tags
            .read()
            .keys()
            .filter(|(_, t)| t == tag)
            .map(|(id, _)| *id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn memory_store_matches_rocks_semantics() {
        let store = MemoryStore::new();
        let game = DatabaseId::new(55);

        store.insert_tag(game, "trash").unwrap();
        store.insert_tag(game, "bluff").unwrap();
        store.insert_tag(game, "bluff").unwrap();
        store.insert_tag(DatabaseId::new(3), "bluff").unwrap();

        assert_eq!(store.get_all_tags(game).unwrap(), vec!["bluff", "trash"]);
        assert_eq!(
            store.list_tagged_games("bluff").unwrap(),
            vec![DatabaseId::new(3), game]
        );
        assert_eq!(store.len(), 3);

        store.delete_tag(game, "missing").unwrap();
        store.delete_tag(game, "bluff").unwrap();
        assert_eq!(store.get_all_tags(game).unwrap(), vec!["trash"]);
    }

    #[test]
    fn insert_rejects_nul() {
        let store = MemoryStore::new();
        let result = store.insert_tag(DatabaseId::new(1), "bad\0tag");
        assert!(matches!(result, Err(StoreError::InvalidTag(_))));
        assert!(store.is_empty());
    }
}
