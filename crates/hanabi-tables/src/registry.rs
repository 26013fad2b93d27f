//! The table registry and the lock acquisition protocol.
//!
//! Two lock granularities protect table state:
//!
//! - the **registry lock** guards the collection itself (creation, removal,
//!   lookup);
//! - each **table lock** guards one table's fields.
//!
//! # Lock Ordering
//!
//! The registry lock is only ever held for a map operation. Nothing waits
//! for a table lock while holding the registry lock on its own behalf, and
//! nothing asks for the registry lock while holding a table lock.
//! [`TableRegistry::table_and_lock`] acquires in two steps:
//!
//! ```text
//!   lock registry ─▶ clone table handle ─▶ unlock registry ─▶ lock table
//! ```
//!
//! A command queued behind a busy table therefore never holds up commands
//! on other tables. Because the table can be removed between the two steps,
//! eviction is flagged on the table itself: `remove_table` sets
//! [`Table::removed`] under the table lock before dropping the map entry, and
//! a lookup that wins the lock afterwards reports the table as missing.
//!
//! Locks are not re-entrant. A caller that already holds one proves it by
//! passing a borrow through [`TableAccess`], so there is no way to ask for a
//! lock twice.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use hanabi_core::TableId;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::error::{Result, TableError};
use crate::session::Session;
use crate::table::Table;

/// A shared, individually lockable table.
pub type TableHandle = Arc<Mutex<Table>>;

/// The collection guarded by the registry lock.
pub type Tables = HashMap<TableId, TableHandle>;

/// How a caller stands with respect to the locks when asking for a table.
pub enum TableAccess<'a> {
    /// Hold nothing: take the registry lock, then the table lock.
    Acquire,
    /// The registry lock is already held by the caller; only the table lock is taken.
    TablesHeld(&'a Tables),
    /// The table lock is already held by the caller; nothing is taken.
    TableHeld(&'a mut Table),
}

/// A table reached through [`TableRegistry::table_and_lock`].
///
/// Dropping it releases exactly the locks that call acquired, on every exit
/// path of the caller.
pub enum LockedTable<'a> {
    /// The table lock was acquired by this handle.
    Owned(OwnedMutexGuard<Table>),
    /// The caller's own lock; nothing is released on drop.
    Borrowed(&'a mut Table),
}

impl Deref for LockedTable<'_> {
    type Target = Table;

    fn deref(&self) -> &Table {
        match self {
            Self::Owned(guard) => &**guard,
            Self::Borrowed(table) => &**table,
        }
    }
}

impl DerefMut for LockedTable<'_> {
    fn deref_mut(&mut self) -> &mut Table {
        match self {
            Self::Owned(guard) => &mut **guard,
            Self::Borrowed(table) => &mut **table,
        }
    }
}

/// Owns every table in the process.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Mutex<Tables>,
}

impl TableRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the registry lock.
    ///
    /// Hold the guard for as short a time as possible: every lookup waits on it.
    pub async fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().await
    }

    /// Take the registry lock if it is free.
    #[must_use]
    pub fn try_lock_tables(&self) -> Option<MutexGuard<'_, Tables>> {
        self.tables.try_lock().ok()
    }

    /// Register a new table.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TableExists` if the ID is taken.
    pub async fn create_table(&self, table: Table) -> Result<()> {
        let table_id = table.id();
        let name = table.name().to_string();
        let owner = table.owner();

        let mut tables = self.tables.lock().await;
        if tables.contains_key(&table_id) {
            return Err(TableError::TableExists(table_id));
        }
        tables.insert(table_id, Arc::new(Mutex::new(table)));

        tracing::info!(
            table_id = %table_id,
            name = %name,
            owner = %owner,
            tables = tables.len(),
            "Created table"
        );
        Ok(())
    }

    /// Evict a table.
    ///
    /// Waits for the table lock, so no command is mid-flight on the table
    /// when it leaves the registry. Commands still queued on it will find
    /// it missing. Returns false if it was not registered.
    pub async fn remove_table(&self, table_id: TableId) -> bool {
        let Some(handle) = self.tables.lock().await.get(&table_id).cloned() else {
            return false;
        };

        {
            let mut table = handle.lock().await;
            if table.removed() {
                return false;
            }
            table.mark_removed();
        }

        let mut tables = self.tables.lock().await;
        if tables
            .get(&table_id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle))
        {
            tables.remove(&table_id);
        }

        tracing::info!(table_id = %table_id, tables = tables.len(), "Removed table");
        true
    }

    /// Number of registered tables.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.len()
    }

    /// Whether no tables are registered.
    pub async fn is_empty(&self) -> bool {
        self.tables.lock().await.is_empty()
    }

    /// The IDs of every registered table, in ascending order.
    pub async fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a table and lock it.
    ///
    /// `access` says which locks the caller already holds; only the missing
    /// ones are taken. If the table does not exist, every lock taken by this
    /// call is released, `session` (if any) is warned, and `None` is
    /// returned. The caller must then stop without touching any state.
    pub async fn table_and_lock<'a>(
        &self,
        session: Option<&dyn Session>,
        table_id: TableId,
        access: TableAccess<'a>,
    ) -> Option<LockedTable<'a>> {
        match access {
            TableAccess::Acquire => {
                let handle = lookup(&*self.tables.lock().await, session, table_id)?;
                let table = lock_live(handle, session, table_id).await?;

                tracing::trace!(table_id = %table_id, "Acquired table lock");
                Some(LockedTable::Owned(table))
            }
            TableAccess::TablesHeld(tables) => {
                let handle = lookup(tables, session, table_id)?;
                let table = lock_live(handle, session, table_id).await?;

                tracing::trace!(
                    table_id = %table_id,
                    "Acquired table lock under held registry lock"
                );
                Some(LockedTable::Owned(table))
            }
            TableAccess::TableHeld(table) => {
                if table.id() != table_id {
                    tracing::error!(
                        table_id = %table_id,
                        held_table_id = %table.id(),
                        "Caller holds the lock of a different table"
                    );
                    return None;
                }
                Some(LockedTable::Borrowed(table))
            }
        }
    }
}

fn lookup(
    tables: &Tables,
    session: Option<&dyn Session>,
    table_id: TableId,
) -> Option<TableHandle> {
    let handle = tables.get(&table_id).cloned();
    if handle.is_none() {
        warn_missing(session, table_id);
    }
    handle
}

/// Lock a handle found by [`lookup`], unless the table was evicted while
/// this call was queued on it.
async fn lock_live(
    handle: TableHandle,
    session: Option<&dyn Session>,
    table_id: TableId,
) -> Option<OwnedMutexGuard<Table>> {
    let table = handle.lock_owned().await;
    if table.removed() {
        tracing::debug!(table_id = %table_id, "Table removed while waiting for its lock");
        warn_missing(session, table_id);
        return None;
    }
    Some(table)
}

fn warn_missing(session: Option<&dyn Session>, table_id: TableId) {
    if let Some(session) = session {
        session.warning(&TableError::TableNotFound(table_id).user_message());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::RecordingSession;
    use hanabi_core::UserId;

    fn game(id: u64) -> Table {
        Table::new_game(TableId::new(id), format!("game {id}"), UserId::new(1))
    }

    async fn registry_with(ids: &[u64]) -> TableRegistry {
        let registry = TableRegistry::new();
        for id in ids {
            registry.create_table(game(*id)).await.unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let registry = registry_with(&[1]).await;
        let result = registry.create_table(game(1)).await;
        assert!(matches!(result, Err(TableError::TableExists(_))));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn acquire_releases_registry_lock_but_holds_table() {
        let registry = registry_with(&[1]).await;

        let table = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();
        assert_eq!(table.id(), TableId::new(1));

        // Registry is free again, the table is not
        let tables = registry.try_lock_tables().unwrap();
        assert!(tables[&TableId::new(1)].try_lock().is_err());
        drop(tables);

        drop(table);
        let tables = registry.try_lock_tables().unwrap();
        assert!(tables[&TableId::new(1)].try_lock().is_ok());
    }

    #[tokio::test]
    async fn missing_table_warns_and_releases() {
        let registry = registry_with(&[1]).await;
        let session = RecordingSession::new(UserId::new(7), "alice");

        let table = registry
            .table_and_lock(Some(&session), TableId::new(2), TableAccess::Acquire)
            .await;

        assert!(table.is_none());
        assert_eq!(session.warnings(), vec!["Table 2 does not exist."]);
        assert!(registry.try_lock_tables().is_some());
    }

    #[tokio::test]
    async fn tables_held_only_takes_table_lock() {
        let registry = registry_with(&[1, 2]).await;

        let tables = registry.lock_tables().await;
        let table = registry
            .table_and_lock(None, TableId::new(2), TableAccess::TablesHeld(&tables))
            .await
            .unwrap();
        assert_eq!(table.id(), TableId::new(2));
        assert!(tables[&TableId::new(2)].try_lock().is_err());
        drop(table);
        assert!(tables[&TableId::new(2)].try_lock().is_ok());
        drop(tables);

        assert!(registry.try_lock_tables().is_some());
    }

    #[tokio::test]
    async fn table_held_hands_back_the_borrow() {
        let registry = registry_with(&[1]).await;
        let mut outer = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();

        {
            let mut inner = registry
                .table_and_lock(None, TableId::new(1), TableAccess::TableHeld(&mut outer))
                .await
                .unwrap();
            inner.start().unwrap();
        }

        // The inner handle released nothing
        let tables = registry.try_lock_tables().unwrap();
        assert!(tables[&TableId::new(1)].try_lock().is_err());
        drop(tables);
        assert!(outer.running());
    }

    #[tokio::test]
    async fn table_held_rejects_mismatched_id() {
        let registry = registry_with(&[1, 2]).await;
        let mut outer = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();

        let inner = registry
            .table_and_lock(None, TableId::new(2), TableAccess::TableHeld(&mut outer))
            .await;
        assert!(inner.is_none());
    }

    #[tokio::test]
    async fn remove_waits_for_in_flight_command() {
        let registry = Arc::new(registry_with(&[1]).await);
        let table = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();

        let remover = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.remove_table(TableId::new(1)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!remover.is_finished());

        drop(table);
        assert!(remover.await.unwrap());
        assert!(registry.is_empty().await);
        assert!(!registry.remove_table(TableId::new(1)).await);
    }

    #[tokio::test]
    async fn queued_waiter_does_not_block_other_tables() {
        let registry = Arc::new(registry_with(&[1, 2]).await);
        let held = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
                    .await
                    .is_some()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let other = tokio::time::timeout(
            Duration::from_secs(1),
            registry.table_and_lock(None, TableId::new(2), TableAccess::Acquire),
        )
        .await
        .expect("lookup of table 2 blocked behind table 1");
        assert!(other.is_some());
        drop(other);

        tokio::time::timeout(Duration::from_secs(1), registry.create_table(game(3)))
            .await
            .expect("create blocked behind table 1")
            .unwrap();

        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn waiter_on_removed_table_sees_it_missing() {
        let registry = Arc::new(registry_with(&[1]).await);
        let session = Arc::new(RecordingSession::new(UserId::new(7), "alice"));
        let held = registry
            .table_and_lock(None, TableId::new(1), TableAccess::Acquire)
            .await
            .unwrap();

        let remover = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.remove_table(TableId::new(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                registry
                    .table_and_lock(Some(&*session), TableId::new(1), TableAccess::Acquire)
                    .await
                    .is_none()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert!(remover.await.unwrap());
        assert!(waiter.await.unwrap());
        assert_eq!(session.warnings(), vec!["Table 1 does not exist."]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn table_ids_sorted() {
        let registry = registry_with(&[30, 4, 12]).await;
        assert_eq!(
            registry.table_ids().await,
            vec![TableId::new(4), TableId::new(12), TableId::new(30)]
        );
    }
}
