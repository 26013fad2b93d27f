//! Per-game table state.
//!
//! A `Table` is only ever reached through its lock (see [`crate::registry`]),
//! so every method here assumes exclusive access.
//!
//! # State Machine
//!
//! ```text
//!   ┌──────────────┐  start   ┌─────────────┐  finish  ┌──────────────┐
//!   │ LIVE (idle)  │─────────▶│ LIVE running│─────────▶│ LIVE (ended) │
//!   └──────────────┘          └──────┬──────┘          └──────┬───────┘
//!                                    │ archive                │ archive
//!                                    ▼                        ▼
//!                             ┌─────────────────────────────────────┐
//!                             │               REPLAY                │
//!                             └─────────────────────────────────────┘
//! ```
//!
//! There is no way back from REPLAY.

use hanabi_core::{DatabaseId, RoomId, TableId, UserId};
use hanabi_store::TagStore;

use crate::error::{Result, TableError};
use crate::tags::TagBackend;

/// Options that only matter for some tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraOptions {
    /// The persisted record of this game, once it has one.
    pub database_id: Option<DatabaseId>,
}

/// One game, live or archived.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    name: String,
    owner: UserId,
    running: bool,
    tags: TagBackend,
    room: RoomId,
    extra_options: ExtraOptions,
    removed: bool,
}

impl Table {
    /// Create a table for a new game. It is live but not yet running.
    #[must_use]
    pub fn new_game(id: TableId, name: impl Into<String>, owner: UserId) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            running: false,
            tags: TagBackend::default(),
            room: RoomId::for_table(id),
            extra_options: ExtraOptions::default(),
            removed: false,
        }
    }

    /// Create a table reviewing an archived game.
    #[must_use]
    pub fn new_replay(
        id: TableId,
        name: impl Into<String>,
        owner: UserId,
        database_id: DatabaseId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            running: true,
            tags: TagBackend::Persisted(database_id),
            room: RoomId::for_table(id),
            extra_options: ExtraOptions {
                database_id: Some(database_id),
            },
            removed: false,
        }
    }

    /// The table's identifier.
    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    /// The table's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The user who created the table.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Whether the game is in play (always true for a replay being reviewed).
    #[must_use]
    pub const fn running(&self) -> bool {
        self.running
    }

    /// Whether the table is an archived game.
    #[must_use]
    pub const fn replay(&self) -> bool {
        self.tags.is_persisted()
    }

    /// The chat room of the table.
    #[must_use]
    pub const fn room(&self) -> &RoomId {
        &self.room
    }

    /// Options that are only set for some tables.
    #[must_use]
    pub const fn extra_options(&self) -> &ExtraOptions {
        &self.extra_options
    }

    /// Whether the table has left the registry.
    ///
    /// A command that was waiting for this table's lock when it was removed
    /// sees this and treats the table as missing.
    #[must_use]
    pub const fn removed(&self) -> bool {
        self.removed
    }

    /// Flag the table as evicted. Only the registry calls this, under the
    /// table lock.
    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// The authoritative tag backend.
    #[must_use]
    pub const fn tags(&self) -> &TagBackend {
        &self.tags
    }

    /// Mutable access to the authoritative tag backend.
    pub fn tags_mut(&mut self) -> &mut TagBackend {
        &mut self.tags
    }

    /// Mark the game as started.
    ///
    /// # Errors
    ///
    /// Returns `TableError::AlreadyReplay` for an archived game.
    pub fn start(&mut self) -> Result<()> {
        if self.replay() {
            return Err(TableError::AlreadyReplay(self.id));
        }
        self.running = true;
        Ok(())
    }

    /// Mark the game as over. Its tags stay in memory until it is archived.
    pub fn finish(&mut self) {
        if !self.replay() {
            self.running = false;
        }
    }

    /// Turn the table into a replay backed by `database_id`.
    ///
    /// Every in-memory tag is written to `store` first; the backend only
    /// switches once all of them are persisted, so a failed archival leaves
    /// the table live with its tags intact. Returns the number of migrated
    /// tags.
    ///
    /// # Errors
    ///
    /// Returns `TableError::AlreadyReplay` if the table is already archived,
    /// or `TableError::Storage` if a tag could not be persisted.
    pub fn archive<S: TagStore + ?Sized>(
        &mut self,
        database_id: DatabaseId,
        store: &S,
    ) -> Result<usize> {
        let TagBackend::InMemory(tags) = &self.tags else {
            return Err(TableError::AlreadyReplay(self.id));
        };

        for tag in tags.keys() {
            store
                .insert_tag(database_id, tag)
                .map_err(|source| TableError::Storage {
                    database_id,
                    operation: "migrate a tag",
                    source,
                })?;
        }

        let migrated = tags.len();
        self.tags = TagBackend::Persisted(database_id);
        self.extra_options.database_id = Some(database_id);
        self.running = true;

        Ok(migrated)
    }
}
