//! Session and chat collaborators.
//!
//! Commands report back through two channels: the originating session
//! (warnings and errors) and the chat system (private acknowledgements and
//! room broadcasts). Transport is not this crate's concern; these traits are
//! the seam.

use hanabi_core::{RoomId, UserId};

/// The connection a command arrived on.
pub trait Session: Send + Sync {
    /// The user behind the session.
    fn user_id(&self) -> UserId;

    /// The display name used in public announcements.
    fn username(&self) -> &str;

    /// Send a warning: the command was rejected because of something the user did.
    fn warning(&self, msg: &str);

    /// Send an error: the command failed because of the server.
    fn error(&self, msg: &str);
}

/// Chat delivery.
pub trait Chat: Send + Sync {
    /// Deliver `text` to `session` only.
    fn send_private(&self, session: &dyn Session, text: &str);

    /// Broadcast `text` to everyone in `room`.
    fn send_public(&self, room: &RoomId, text: &str);
}
