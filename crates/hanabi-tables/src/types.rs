//! Request types for table commands.

use hanabi_core::TableId;
use serde::{Deserialize, Serialize};

/// The payload of a table-scoped chat command.
///
/// Example data:
///
/// ```json
/// { "tableID": 123, "msg": "inverted priority finesse" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandData {
    /// The table the command targets.
    #[serde(rename = "tableID")]
    pub table_id: TableId,
    /// Raw, unsanitized text.
    #[serde(default)]
    pub msg: String,
}

impl CommandData {
    /// Create a command for `table_id` carrying `msg`.
    #[must_use]
    pub fn new(table_id: TableId, msg: impl Into<String>) -> Self {
        Self {
            table_id,
            msg: msg.into(),
        }
    }
}
