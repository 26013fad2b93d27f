//! Core types and utilities for the hanabi table server.
//!
//! This crate provides the foundational types shared by the storage layer and
//! the table layer:
//!
//! - **Identifiers**: Strongly-typed IDs for tables, archived games, users, and chat rooms
//! - **Error types**: Identifier parse errors
//!
//! # Example
//!
//! ```
//! use hanabi_core::{DatabaseId, RoomId, TableId};
//!
//! let table_id: TableId = "123".parse().unwrap();
//! assert_eq!(RoomId::for_table(table_id).as_str(), "table123");
//!
//! let database_id = DatabaseId::new(55);
//! assert_eq!(database_id.get(), 55);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;

pub use error::IdError;
pub use ids::{DatabaseId, RoomId, TableId, UserId};
