//! End-to-end tests of the tag commands against live and archived tables.

use std::sync::Arc;

use hanabi_core::{DatabaseId, RoomId, TableId, UserId};
use hanabi_store::{MemoryStore, RocksStore, TagStore};
use hanabi_tables::testing::{Delivery, InstrumentedStore, RecordingChat, RecordingSession};
use hanabi_tables::{
    CommandData, Table, TableCommands, TableRegistry, TableService, TablesConfig,
    DEFAULT_ERROR_MSG, NOT_STARTED_FAIL,
};

const TABLE: TableId = TableId::new(123);
const GAME: DatabaseId = DatabaseId::new(55);

type Store = InstrumentedStore<MemoryStore>;

struct Harness {
    service: TableService<Store, RecordingChat>,
    store: Arc<Store>,
    chat: Arc<RecordingChat>,
    session: RecordingSession,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InstrumentedStore::new(MemoryStore::new()));
        let chat = Arc::new(RecordingChat::new());
        let service = TableService::new(
            Arc::new(TableRegistry::new()),
            Arc::clone(&store),
            Arc::clone(&chat),
            &TablesConfig::default(),
        );
        Self {
            service,
            store,
            chat,
            session: RecordingSession::new(UserId::new(7), "alice"),
        }
    }

    async fn live(tags: &[&str]) -> Self {
        let harness = Self::new();
        harness
            .service
            .create_table(Table::new_game(TABLE, "test game", UserId::new(1)))
            .await
            .unwrap();
        harness.service.start_game(TABLE).await.unwrap();
        for tag in tags {
            harness.add(tag).await;
        }
        harness
    }

    async fn replay(tags: &[&str]) -> Self {
        let harness = Self::new();
        for tag in tags {
            harness.store.inner().insert_tag(GAME, tag).unwrap();
        }
        harness
            .service
            .create_table(Table::new_replay(TABLE, "test game", UserId::new(1), GAME))
            .await
            .unwrap();
        harness
    }

    async fn add(&self, tag: &str) {
        self.service
            .tag_add(&self.session, CommandData::new(TABLE, tag))
            .await;
    }

    async fn delete(&self, tag: &str) {
        self.service
            .tag_delete(&self.session, CommandData::new(TABLE, tag))
            .await;
    }

    async fn live_tags(&self) -> Vec<String> {
        let table = self
            .service
            .registry()
            .table_and_lock(None, TABLE, hanabi_tables::TableAccess::Acquire)
            .await
            .unwrap();
        table.tags().list(self.store.inner()).unwrap()
    }

    fn assert_unlocked(&self) {
        let tables = self
            .service
            .registry()
            .try_lock_tables()
            .expect("registry lock leaked");
        if let Some(handle) = tables.get(&TABLE) {
            assert!(handle.try_lock().is_ok(), "table lock leaked");
        }
    }
}

#[tokio::test]
async fn live_delete_acknowledges_privately() {
    let h = Harness::live(&["finesse"]).await;
    let before = h.chat.deliveries().len();

    h.delete("finesse").await;

    assert!(h.live_tags().await.is_empty());
    assert_eq!(
        h.chat.deliveries()[before..],
        [Delivery::Private {
            user_id: UserId::new(7),
            text: "Successfully deleted the tag of \"finesse\".".to_string(),
        }]
    );
    assert!(h.session.warnings().is_empty());
    assert_eq!(h.store.deletes(), 0);
    h.assert_unlocked();
}

#[tokio::test]
async fn live_delete_of_absent_tag_warns() {
    let h = Harness::live(&[]).await;

    h.delete("finesse").await;

    assert!(h.live_tags().await.is_empty());
    assert_eq!(
        h.session.warnings(),
        vec!["The tag of \"finesse\" does not exist on this game yet."]
    );
    assert!(h.chat.deliveries().is_empty());
    h.assert_unlocked();
}

#[tokio::test]
async fn live_delete_only_touches_that_tag() {
    let h = Harness::live(&["bluff", "finesse", "trash"]).await;

    h.delete("  FINESSE ").await;

    assert_eq!(h.live_tags().await, vec!["bluff", "trash"]);
}

#[tokio::test]
async fn replay_delete_broadcasts_to_room() {
    let h = Harness::replay(&["finesse"]).await;

    h.delete("finesse").await;

    assert!(h.store.inner().get_all_tags(GAME).unwrap().is_empty());
    assert_eq!(h.store.deletes(), 1);
    assert_eq!(
        h.chat.deliveries(),
        vec![Delivery::Public {
            room: RoomId::for_table(TABLE),
            text: "alice has deleted a game tag of \"finesse\".".to_string(),
        }]
    );
    h.assert_unlocked();
}

#[tokio::test]
async fn replay_delete_of_absent_tag_never_deletes() {
    let h = Harness::replay(&["bluff"]).await;

    h.delete("finesse").await;

    assert_eq!(h.store.reads(), 1);
    assert_eq!(h.store.deletes(), 0);
    assert_eq!(h.store.inner().get_all_tags(GAME).unwrap(), vec!["bluff"]);
    assert_eq!(
        h.session.warnings(),
        vec!["The tag of \"finesse\" does not exist on this game yet."]
    );
    h.assert_unlocked();
}

#[tokio::test]
async fn replay_read_failure_reports_generic_error() {
    let h = Harness::replay(&["finesse"]).await;
    h.store.fail_reads(true);

    h.delete("finesse").await;

    assert_eq!(h.session.errors(), vec![DEFAULT_ERROR_MSG]);
    assert!(h.session.warnings().is_empty());
    assert!(h.chat.deliveries().is_empty());
    assert_eq!(h.store.deletes(), 0);
    assert_eq!(h.store.inner().get_all_tags(GAME).unwrap(), vec!["finesse"]);
    h.assert_unlocked();
}

#[tokio::test]
async fn replay_delete_failure_reports_generic_error() {
    let h = Harness::replay(&["finesse"]).await;
    h.store.fail_writes(true);

    h.delete("finesse").await;

    assert_eq!(h.session.errors(), vec![DEFAULT_ERROR_MSG]);
    assert_eq!(h.store.deletes(), 1);
    assert_eq!(h.store.inner().get_all_tags(GAME).unwrap(), vec!["finesse"]);
    assert!(h.chat.deliveries().is_empty());
    h.assert_unlocked();
}

#[tokio::test]
async fn missing_table_warns_without_side_effects() {
    let h = Harness::new();

    h.delete("finesse").await;
    h.add("finesse").await;

    assert_eq!(
        h.session.warnings(),
        vec!["Table 123 does not exist.", "Table 123 does not exist."]
    );
    assert_eq!(h.store.reads() + h.store.inserts() + h.store.deletes(), 0);
    assert!(h.chat.deliveries().is_empty());
    h.assert_unlocked();
}

#[tokio::test]
async fn unstarted_game_rejects_tag_commands() {
    let h = Harness::new();
    h.service
        .create_table(Table::new_game(TABLE, "test game", UserId::new(1)))
        .await
        .unwrap();

    h.add("finesse").await;
    h.delete("finesse").await;

    assert_eq!(h.session.warnings(), vec![NOT_STARTED_FAIL, NOT_STARTED_FAIL]);
    assert!(h.chat.deliveries().is_empty());
    h.assert_unlocked();
}

#[tokio::test]
async fn invalid_tag_is_rejected_before_storage() {
    let h = Harness::replay(&["finesse"]).await;

    h.delete("   ").await;
    h.delete(&"x".repeat(200)).await;

    assert_eq!(
        h.session.warnings(),
        vec![
            "Tags cannot be blank.",
            "Tags cannot be longer than 100 characters."
        ]
    );
    assert_eq!(h.store.reads(), 0);
    h.assert_unlocked();
}

#[tokio::test]
async fn finished_game_keeps_tags_until_archived() {
    let h = Harness::live(&["finesse"]).await;
    h.service.finish_game(TABLE).await.unwrap();

    // Not running and not a replay yet
    h.delete("finesse").await;
    assert_eq!(h.session.warnings(), vec![NOT_STARTED_FAIL]);

    let migrated = h.service.archive_table(TABLE, GAME).await.unwrap();
    assert_eq!(migrated, 1);
    assert_eq!(h.store.inner().get_all_tags(GAME).unwrap(), vec!["finesse"]);

    h.delete("finesse").await;
    assert!(h.store.inner().get_all_tags(GAME).unwrap().is_empty());
    assert_eq!(
        h.chat.deliveries().last(),
        Some(&Delivery::Public {
            room: RoomId::for_table(TABLE),
            text: "alice has deleted a game tag of \"finesse\".".to_string(),
        })
    );
}

#[tokio::test]
async fn failed_archive_leaves_table_live() {
    let h = Harness::live(&["finesse"]).await;
    h.store.fail_writes(true);

    let result = h.service.archive_table(TABLE, GAME).await;

    assert!(result.is_err());
    h.store.fail_writes(false);
    assert_eq!(h.live_tags().await, vec!["finesse"]);
    assert!(h.store.inner().is_empty());
    h.assert_unlocked();
}

#[tokio::test]
async fn replay_delete_against_rocksdb() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    store.insert_tag(GAME, "finesse").unwrap();
    store.insert_tag(GAME, "bluff").unwrap();

    let chat = Arc::new(RecordingChat::new());
    let service = TableService::with_defaults(Arc::clone(&store), Arc::clone(&chat));
    service
        .create_table(Table::new_replay(TABLE, "test game", UserId::new(1), GAME))
        .await
        .unwrap();
    let session = RecordingSession::new(UserId::new(7), "alice");

    service
        .tag_delete(&session, CommandData::new(TABLE, "finesse"))
        .await;

    assert_eq!(store.get_all_tags(GAME).unwrap(), vec!["bluff"]);
    assert!(store.list_tagged_games("finesse").unwrap().is_empty());
    assert_eq!(chat.deliveries().len(), 1);
}
