//! Key encoding utilities for `RocksDB`.
//!
//! Game IDs are encoded big-endian so a prefix scan over one game returns its
//! tags in byte order, and so games sort numerically in the reverse index.

use hanabi_core::DatabaseId;

use crate::error::{Result, StoreError};

const ID_LEN: usize = 8;

/// Separates the tag from the game ID in reverse index keys.
const TAG_TERMINATOR: u8 = 0x00;

/// Reject tags that would break the reverse index encoding.
///
/// # Errors
///
/// Returns `StoreError::InvalidTag` if the tag contains a NUL byte.
pub fn check_tag(tag: &str) -> Result<()> {
    if tag.as_bytes().contains(&TAG_TERMINATOR) {
        return Err(StoreError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Encode a game tag key: `database_id || tag`.
#[must_use]
pub fn game_tag_key(database_id: DatabaseId, tag: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN + tag.len());
    key.extend_from_slice(&database_id.to_be_bytes());
    key.extend_from_slice(tag.as_bytes());
    key
}

/// Encode a game prefix for scanning all tags of one game.
#[must_use]
pub fn game_prefix(database_id: DatabaseId) -> Vec<u8> {
    database_id.to_be_bytes().to_vec()
}

/// Extract the tag text from a game tag key.
///
/// Returns `None` if the key is shorter than a game ID or the tag is not UTF-8.
#[must_use]
pub fn extract_tag_from_game_tag_key(key: &[u8]) -> Option<String> {
    let tag = key.get(ID_LEN..)?;
    String::from_utf8(tag.to_vec()).ok()
}

/// Encode a tag-game index key: `tag || 0x00 || database_id`.
#[must_use]
pub fn tag_game_key(tag: &str, database_id: DatabaseId) -> Vec<u8> {
    let mut key = tag_prefix(tag);
    key.extend_from_slice(&database_id.to_be_bytes());
    key
}

/// Encode a tag prefix for scanning all games carrying a tag.
#[must_use]
pub fn tag_prefix(tag: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(tag.len() + 1 + ID_LEN);
    key.extend_from_slice(tag.as_bytes());
    key.push(TAG_TERMINATOR);
    key
}

/// Extract the game ID from a tag-game index key.
///
/// Returns `None` if the key is too short to hold a game ID.
#[must_use]
pub fn extract_database_id_from_tag_game_key(key: &[u8]) -> Option<DatabaseId> {
    let start = key.len().checked_sub(ID_LEN)?;
    let bytes: [u8; ID_LEN] = key[start..].try_into().ok()?;
    Some(DatabaseId::from_be_bytes(bytes))
}
