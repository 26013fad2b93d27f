//! Core identifier types for the hanabi table server.
//!
//! This module provides strongly-typed identifiers for tables, archived games,
//! users, and chat rooms. Numeric IDs serialize as plain numbers so they match
//! the `tableID` fields clients already send.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IdError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new identifier from its raw value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the raw value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Return the big-endian byte encoding, used for ordered storage keys.
            #[must_use]
            pub const fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            /// Decode an identifier from its big-endian byte encoding.
            #[must_use]
            pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidNumber(s.to_string()))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id! {
    /// Identifier of a table held in the in-memory registry.
    ///
    /// Table IDs are assigned when a game session starts and never change.
    TableId
}

numeric_id! {
    /// Identifier of a game's persisted record.
    ///
    /// Only tables that have been (or will be) archived carry one.
    DatabaseId
}

numeric_id! {
    /// Identifier of a registered user.
    UserId
}

/// Name of the chat channel messages for a table are broadcast to.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// The room every table broadcasts to: `table{id}`.
    #[must_use]
    pub fn for_table(table_id: TableId) -> Self {
        Self(format!("table{table_id}"))
    }

    /// Return the room name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
