//! Table service implementation.
//!
//! This module provides the `TableCommands` trait and the `TableService`
//! implementation that runs tag commands against locked tables.
//!
//! Every table-scoped handler has the same shape:
//!
//! 1. acquire the table through [`TableRegistry::table_and_lock`];
//! 2. check preconditions (the game must be running or a replay);
//! 3. sanitize the free-text input;
//! 4. run the tag operation on the table's authoritative backend;
//! 5. report the outcome, and let the table guard drop.
//!
//! Handlers never return errors. Each failure becomes a message to the
//! requester and, for infrastructure failures, an error log event.

use std::sync::Arc;

use async_trait::async_trait;
use hanabi_core::{DatabaseId, TableId};
use hanabi_store::TagStore;

use crate::config::TablesConfig;
use crate::error::{Result, TableError, DEFAULT_ERROR_MSG};
use crate::registry::{TableAccess, TableRegistry};
use crate::sanitize::Sanitizer;
use crate::session::{Chat, Session};
use crate::table::Table;
use crate::tags::{Deletion, Insertion};
use crate::types::CommandData;

/// Trait defining the chat commands that operate on tags.
#[async_trait]
pub trait TableCommands: Send + Sync {
    /// `/tag`: attach a tag to the game at a table.
    async fn tag_add(&self, session: &dyn Session, data: CommandData);

    /// `/tagdelete`: remove a tag from the game at a table.
    async fn tag_delete(&self, session: &dyn Session, data: CommandData);

    /// `/tags`: privately list the tags of the game at a table.
    async fn tag_list(&self, session: &dyn Session, data: CommandData);

    /// `/tagsearch`: privately list the archived games carrying a tag.
    async fn tag_search(&self, session: &dyn Session, data: CommandData);
}

/// The main table service implementation.
pub struct TableService<S: TagStore, C: Chat> {
    registry: Arc<TableRegistry>,
    store: Arc<S>,
    chat: Arc<C>,
    sanitizer: Arc<dyn Sanitizer>,
}

impl<S: TagStore, C: Chat> TableService<S, C> {
    /// Create a new table service.
    #[must_use]
    pub fn new(
        registry: Arc<TableRegistry>,
        store: Arc<S>,
        chat: Arc<C>,
        config: &TablesConfig,
    ) -> Self {
        Self {
            registry,
            store,
            chat,
            sanitizer: Arc::new(config.sanitizer()),
        }
    }

    /// Create with default configuration and an empty registry.
    #[must_use]
    pub fn with_defaults(store: Arc<S>, chat: Arc<C>) -> Self {
        Self::new(
            Arc::new(TableRegistry::new()),
            store,
            chat,
            &TablesConfig::default(),
        )
    }

    /// Replace the tag sanitizer.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Get a reference to the registry.
    #[must_use]
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Table Lifecycle
    // =========================================================================

    /// Register a new table.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TableExists` if the ID is taken.
    pub async fn create_table(&self, table: Table) -> Result<()> {
        self.registry.create_table(table).await
    }

    /// Mark the game at a table as started.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TableNotFound` or `TableError::AlreadyReplay`.
    pub async fn start_game(&self, table_id: TableId) -> Result<()> {
        let mut table = self
            .registry
            .table_and_lock(None, table_id, TableAccess::Acquire)
            .await
            .ok_or(TableError::TableNotFound(table_id))?;
        table.start()?;

        tracing::info!(table_id = %table_id, "Started game");
        Ok(())
    }

    /// Mark the game at a table as over.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TableNotFound` if the table does not exist.
    pub async fn finish_game(&self, table_id: TableId) -> Result<()> {
        let mut table = self
            .registry
            .table_and_lock(None, table_id, TableAccess::Acquire)
            .await
            .ok_or(TableError::TableNotFound(table_id))?;
        table.finish();

        tracing::info!(table_id = %table_id, "Finished game");
        Ok(())
    }

    /// Archive the game at a table under `database_id`, migrating its tags.
    ///
    /// Runs under the table lock, so it is serialized against every tag
    /// command on the same table. Returns the number of migrated tags.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TableNotFound`, `TableError::AlreadyReplay`, or
    /// `TableError::Storage` if a tag could not be persisted (the table then
    /// stays live).
    pub async fn archive_table(&self, table_id: TableId, database_id: DatabaseId) -> Result<usize> {
        let mut table = self
            .registry
            .table_and_lock(None, table_id, TableAccess::Acquire)
            .await
            .ok_or(TableError::TableNotFound(table_id))?;

        match table.archive(database_id, &*self.store) {
            Ok(migrated) => {
                tracing::info!(
                    table_id = %table_id,
                    database_id = %database_id,
                    migrated,
                    "Archived table as replay"
                );
                Ok(migrated)
            }
            Err(err) => {
                tracing::error!(
                    table_id = %table_id,
                    database_id = %database_id,
                    error = %err,
                    "Failed to archive table"
                );
                Err(err)
            }
        }
    }

    /// Evict a table from the registry.
    pub async fn remove_table(&self, table_id: TableId) -> bool {
        self.registry.remove_table(table_id).await
    }

    // =========================================================================
    // Tag Commands
    // =========================================================================

    /// `/tag`, for callers that may already hold a lock.
    pub async fn tag_add_with(
        &self,
        session: &dyn Session,
        data: CommandData,
        access: TableAccess<'_>,
    ) {
        let Some(mut table) = self
            .registry
            .table_and_lock(Some(session), data.table_id, access)
            .await
        else {
            return;
        };

        let Some(tag) = self.check_tag_command(session, &table, &data.msg) else {
            return;
        };

        let replay = table.replay();
        match table
            .tags_mut()
            .insert(&*self.store, &tag, session.user_id())
        {
            Ok(Insertion::Added) => {
                tracing::debug!(table_id = %data.table_id, tag = %tag, replay, "Added tag");
                if replay {
                    let msg = format!("{} has added a game tag of \"{tag}\".", session.username());
                    self.chat.send_public(table.room(), &msg);
                } else {
                    // Private, so the tag does not spoil the ongoing game
                    let msg = format!("Successfully added a tag of \"{tag}\".");
                    self.chat.send_private(session, &msg);
                }
            }
            Ok(Insertion::Duplicate) => {
                session.warning(&format!("This game has already been tagged with \"{tag}\"."));
            }
            Err(err) => report(session, &table, "tag", &err),
        }
    }

    /// `/tagdelete`, for callers that may already hold a lock.
    pub async fn tag_delete_with(
        &self,
        session: &dyn Session,
        data: CommandData,
        access: TableAccess<'_>,
    ) {
        let Some(mut table) = self
            .registry
            .table_and_lock(Some(session), data.table_id, access)
            .await
        else {
            return;
        };

        let Some(tag) = self.check_tag_command(session, &table, &data.msg) else {
            return;
        };

        let replay = table.replay();
        match table.tags_mut().delete(&*self.store, &tag) {
            Ok(Deletion::Deleted) => {
                tracing::debug!(table_id = %data.table_id, tag = %tag, replay, "Deleted tag");
                if replay {
                    let msg = format!(
                        "{} has deleted a game tag of \"{tag}\".",
                        session.username()
                    );
                    self.chat.send_public(table.room(), &msg);
                } else {
                    // Private, so the tag does not spoil the ongoing game
                    let msg = format!("Successfully deleted the tag of \"{tag}\".");
                    self.chat.send_private(session, &msg);
                }
            }
            Ok(Deletion::NotFound) => {
                session.warning(&format!(
                    "The tag of \"{tag}\" does not exist on this game yet."
                ));
            }
            Err(err) => report(session, &table, "tagdelete", &err),
        }
    }

    /// `/tags`, for callers that may already hold a lock.
    pub async fn tag_list_with(
        &self,
        session: &dyn Session,
        data: CommandData,
        access: TableAccess<'_>,
    ) {
        let Some(table) = self
            .registry
            .table_and_lock(Some(session), data.table_id, access)
            .await
        else {
            return;
        };

        if let Err(err) = ensure_started(&table) {
            session.warning(&err.user_message());
            return;
        }

        match table.tags().list(&*self.store) {
            Ok(tags) if tags.is_empty() => {
                self.chat
                    .send_private(session, "There are no tags for this game.");
            }
            Ok(tags) => {
                let msg = format!("The tags for this game are: {}", tags.join(", "));
                self.chat.send_private(session, &msg);
            }
            Err(err) => report(session, &table, "tags", &err),
        }
    }

    /// Check the precondition shared by tag mutations and sanitize the tag.
    ///
    /// Warns the requester and returns `None` if the command must stop.
    fn check_tag_command(&self, session: &dyn Session, table: &Table, msg: &str) -> Option<String> {
        if let Err(err) = ensure_started(table) {
            session.warning(&err.user_message());
            return None;
        }

        match self.sanitizer.sanitize(msg) {
            Ok(tag) => Some(tag),
            Err(err) => {
                session.warning(&TableError::from(err).user_message());
                None
            }
        }
    }
}

/// Tag commands need a game in progress or an archived one.
fn ensure_started(table: &Table) -> Result<()> {
    if table.running() || table.replay() {
        Ok(())
    } else {
        Err(TableError::NotStarted(table.id()))
    }
}

/// Turn a failed tag operation into a log event and/or a user message.
fn report(session: &dyn Session, table: &Table, command: &'static str, err: &TableError) {
    match err {
        TableError::Storage {
            database_id,
            operation,
            source,
        } => {
            tracing::error!(
                table_id = %table.id(),
                database_id = %database_id,
                operation = *operation,
                command,
                error = %source,
                "Failed to {operation} for game ID {database_id}"
            );
            session.error(&err.user_message());
        }
        _ if err.is_infrastructure() => {
            tracing::error!(table_id = %table.id(), command, error = %err, "Tag command failed");
            session.error(&err.user_message());
        }
        _ => session.warning(&err.user_message()),
    }
}

#[async_trait]
impl<S: TagStore + 'static, C: Chat + 'static> TableCommands for TableService<S, C> {
    async fn tag_add(&self, session: &dyn Session, data: CommandData) {
        self.tag_add_with(session, data, TableAccess::Acquire).await;
    }

    async fn tag_delete(&self, session: &dyn Session, data: CommandData) {
        self.tag_delete_with(session, data, TableAccess::Acquire)
            .await;
    }

    async fn tag_list(&self, session: &dyn Session, data: CommandData) {
        self.tag_list_with(session, data, TableAccess::Acquire).await;
    }

    async fn tag_search(&self, session: &dyn Session, data: CommandData) {
        let tag = match self.sanitizer.sanitize(&data.msg) {
            Ok(tag) => tag,
            Err(err) => {
                session.warning(&TableError::from(err).user_message());
                return;
            }
        };

        let games = match self.store.list_tagged_games(&tag) {
            Ok(games) => games,
            Err(err) => {
                tracing::error!(tag = %tag, error = %err, "Failed to search games by tag");
                session.error(DEFAULT_ERROR_MSG);
                return;
            }
        };

        let msg = if games.is_empty() {
            format!("There are no games matching the tag of \"{tag}\".")
        } else {
            let ids: Vec<String> = games.iter().map(ToString::to_string).collect();
            format!("Games matching the tag of \"{tag}\": {}", ids.join(", "))
        };
        self.chat.send_private(session, &msg);
    }
}
