//! Table registry and tag commands for the hanabi server.
//!
//! This crate owns every table in the process, the protocol for locking
//! them, and the chat commands that read and change a game's tags.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Command dispatch (websocket)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TableService                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Tag        │ │  Sanitizer  │ │   Table lifecycle   │    │
//! │  │  commands   │ │             │ │   (start/archive)   │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │ Registry │   │ TagStore │   │   Chat   │
//!        │ (locks)  │   │ (RocksDB)│   │          │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use hanabi_tables::{CommandData, Table, TableCommands, TableService};
//! use hanabi_tables::session::{Chat, Session};
//! use hanabi_store::MemoryStore;
//! use hanabi_core::{TableId, UserId};
//!
//! # async fn example(session: &dyn Session, chat: Arc<impl Chat + 'static>)
//! # -> Result<(), Box<dyn std::error::Error>> {
//! let service = TableService::with_defaults(Arc::new(MemoryStore::new()), chat);
//!
//! let table_id = TableId::new(123);
//! service
//!     .create_table(Table::new_game(table_id, "Learning game", UserId::new(1)))
//!     .await?;
//! service.start_game(table_id).await?;
//!
//! service
//!     .tag_add(session, CommandData::new(table_id, "finesse"))
//!     .await;
//! service
//!     .tag_delete(session, CommandData::new(table_id, "finesse"))
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! # Tags
//!
//! A live game keeps its tags on the table; an archived game (a replay)
//! keeps them in the [`hanabi_store::TagStore`]. See the [`tags`] module.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod registry;
pub mod sanitize;
pub mod service;
pub mod session;
pub mod table;
pub mod tags;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::TablesConfig;
pub use error::{Result, TableError, DEFAULT_ERROR_MSG, NOT_STARTED_FAIL};
pub use registry::{LockedTable, TableAccess, TableHandle, TableRegistry, Tables};
pub use sanitize::{SanitizeError, Sanitizer, TagSanitizer};
pub use service::{TableCommands, TableService};
pub use table::{ExtraOptions, Table};
pub use tags::{Deletion, Insertion, TagBackend, TagMeta};
pub use types::CommandData;

// Re-export commonly used types from dependencies for convenience
pub use hanabi_core::{DatabaseId, RoomId, TableId, UserId};
