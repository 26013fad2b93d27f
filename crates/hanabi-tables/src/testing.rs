//! Test doubles for the session, chat, and storage collaborators.
//!
//! Enabled with the `test-utils` feature.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hanabi_core::{DatabaseId, RoomId, UserId};
use hanabi_store::{StoreError, TagStore};
use parking_lot::Mutex;

use crate::session::{Chat, Session};

/// A session that records everything sent to it.
#[derive(Debug)]
pub struct RecordingSession {
    user_id: UserId,
    username: String,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingSession {
    /// Create a session for `username`.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            warnings: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Warnings received so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Errors received so far.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl Session for RecordingSession {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn warning(&self, msg: &str) {
        self.warnings.lock().push(msg.to_string());
    }

    fn error(&self, msg: &str) {
        self.errors.lock().push(msg.to_string());
    }
}

/// A chat message captured by [`RecordingChat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to one user.
    Private {
        /// The recipient.
        user_id: UserId,
        /// The message.
        text: String,
    },
    /// Broadcast to a room.
    Public {
        /// The room.
        room: RoomId,
        /// The message.
        text: String,
    },
}

/// A chat system that records deliveries instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingChat {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingChat {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }
}

impl Chat for RecordingChat {
    fn send_private(&self, session: &dyn Session, text: &str) {
        self.deliveries.lock().push(Delivery::Private {
            user_id: session.user_id(),
            text: text.to_string(),
        });
    }

    fn send_public(&self, room: &RoomId, text: &str) {
        self.deliveries.lock().push(Delivery::Public {
            room: room.clone(),
            text: text.to_string(),
        });
    }
}

/// Wraps a store, counting calls and optionally failing them.
#[derive(Debug, Default)]
pub struct InstrumentedStore<S> {
    inner: S,
    reads: AtomicUsize,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<S: TagStore> InstrumentedStore<S> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// The wrapped store, bypassing counters and failures.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Make every read time out (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every insert and delete fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_all_tags` and `list_tagged_games` calls.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `insert_tag` calls.
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `delete_tag` calls.
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, error: fn() -> StoreError) -> hanabi_store::Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(error());
        }
        Ok(())
    }

    fn timed_out() -> StoreError {
        StoreError::Unavailable("injected timeout".to_string())
    }

    fn rejected() -> StoreError {
        StoreError::Database("injected failure".to_string())
    }
}

impl<S: TagStore> TagStore for InstrumentedStore<S> {
    fn get_all_tags(&self, database_id: DatabaseId) -> hanabi_store::Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reads, Self::timed_out)?;
        self.inner.get_all_tags(database_id)
    }

    fn insert_tag(&self, database_id: DatabaseId, tag: &str) -> hanabi_store::Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_writes, Self::rejected)?;
        self.inner.insert_tag(database_id, tag)
    }

    fn delete_tag(&self, database_id: DatabaseId, tag: &str) -> hanabi_store::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_writes, Self::rejected)?;
        self.inner.delete_tag(database_id, tag)
    }

    fn list_tagged_games(&self, tag: &str) -> hanabi_store::Result<Vec<DatabaseId>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reads, Self::timed_out)?;
        self.inner.list_tagged_games(tag)
    }
}
