//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `TagStore` trait.

use std::path::Path;
use std::sync::Arc;

use hanabi_core::DatabaseId;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::GameTag;
use crate::TagStore;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Get the full record of one tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_tag(&self, database_id: DatabaseId, tag: &str) -> Result<Option<GameTag>> {
        let cf = self.cf(cf::GAME_TAGS)?;
        let key = keys::game_tag_key(database_id, tag);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

impl TagStore for RocksStore {
    fn get_all_tags(&self, database_id: DatabaseId) -> Result<Vec<String>> {
        let cf_tags = self.cf(cf::GAME_TAGS)?;
        let prefix = keys::game_prefix(database_id);

        let mut tags = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_tags, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            let tag = keys::extract_tag_from_game_tag_key(&key).ok_or_else(|| {
                StoreError::Serialization(format!("malformed tag key for game {database_id}"))
            })?;
            tags.push(tag);
        }

        Ok(tags)
    }

    fn insert_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()> {
        keys::check_tag(tag)?;
        let cf_tags = self.cf(cf::GAME_TAGS)?;
        let cf_by_tag = self.cf(cf::GAMES_BY_TAG)?;

        let value = Self::serialize(&GameTag::new(database_id, tag))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tags, keys::game_tag_key(database_id, tag), &value);
        batch.put_cf(&cf_by_tag, keys::tag_game_key(tag, database_id), []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(database_id = %database_id, tag = %tag, "Persisted game tag");

        Ok(())
    }

    fn delete_tag(&self, database_id: DatabaseId, tag: &str) -> Result<()> {
        let cf_tags = self.cf(cf::GAME_TAGS)?;
        let cf_by_tag = self.cf(cf::GAMES_BY_TAG)?;

        // Deletes of absent keys are no-ops in RocksDB
        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_tags, keys::game_tag_key(database_id, tag));
        batch.delete_cf(&cf_by_tag, keys::tag_game_key(tag, database_id));

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(database_id = %database_id, tag = %tag, "Deleted game tag");

        Ok(())
    }

    fn list_tagged_games(&self, tag: &str) -> Result<Vec<DatabaseId>> {
        let cf_by_tag = self.cf(cf::GAMES_BY_TAG)?;
        let prefix = keys::tag_prefix(tag);

        let mut games = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_tag, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let database_id = keys::extract_database_id_from_tag_game_key(&key).ok_or_else(
                || StoreError::Serialization(format!("malformed index key for tag {tag:?}")),
            )?;
            games.push(database_id);
        }

        Ok(games)
    }
}
