//! Hanabi Tables - console driver for the table service.
//!
//! Reads one JSON command per line from stdin and writes every message the
//! service produces to stdout as JSON. Commands run concurrently, so lines
//! for the same table are serialized by its lock, not by input order. Tags of
//! archived games are kept in `RocksDB` under `DATA_DIR`, or in memory when it
//! is unset.
//!
//! ```text
//! {"command":"tableCreate","tableID":1,"name":"My game","owner":1}
//! {"command":"tableStart","tableID":1}
//! {"command":"tag","userID":7,"username":"alice","tableID":1,"msg":"finesse"}
//! {"command":"tableArchive","tableID":1,"databaseID":55}
//! {"command":"tagDelete","userID":7,"username":"alice","tableID":1,"msg":"finesse"}
//! ```

use std::sync::Arc;

use hanabi_core::{DatabaseId, RoomId, TableId, UserId};
use hanabi_store::{MemoryStore, RocksStore, TagStore};
use hanabi_tables::session::{Chat, Session};
use hanabi_tables::{CommandData, Table, TableCommands, TableService, TablesConfig};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One line of input.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "userID", default)]
    user_id: Option<UserId>,
    #[serde(default)]
    username: String,
    #[serde(flatten)]
    request: Request,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum Request {
    TableCreate {
        #[serde(rename = "tableID")]
        table_id: TableId,
        name: String,
        owner: UserId,
    },
    TableStart {
        #[serde(rename = "tableID")]
        table_id: TableId,
    },
    TableFinish {
        #[serde(rename = "tableID")]
        table_id: TableId,
    },
    TableArchive {
        #[serde(rename = "tableID")]
        table_id: TableId,
        #[serde(rename = "databaseID")]
        database_id: DatabaseId,
    },
    TableRemove {
        #[serde(rename = "tableID")]
        table_id: TableId,
    },
    Tag(CommandData),
    TagDelete(CommandData),
    Tags(CommandData),
    TagSearch(CommandData),
}

/// A session whose messages go to stdout.
struct ConsoleSession {
    user_id: UserId,
    username: String,
}

impl Session for ConsoleSession {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn warning(&self, msg: &str) {
        emit(&serde_json::json!({ "type": "warning", "userID": self.user_id, "text": msg }));
    }

    fn error(&self, msg: &str) {
        emit(&serde_json::json!({ "type": "error", "userID": self.user_id, "text": msg }));
    }
}

/// Chat delivery to stdout.
struct ConsoleChat;

impl Chat for ConsoleChat {
    fn send_private(&self, session: &dyn Session, text: &str) {
        emit(&serde_json::json!({ "type": "chat", "userID": session.user_id(), "text": text }));
    }

    fn send_public(&self, room: &RoomId, text: &str) {
        emit(&serde_json::json!({ "type": "chat", "room": room.as_str(), "text": text }));
    }
}

fn emit(value: &serde_json::Value) {
    println!("{value}");
}

async fn dispatch<S: TagStore + 'static>(
    service: &TableService<S, ConsoleChat>,
    envelope: Envelope,
) {
    let session = ConsoleSession {
        user_id: envelope.user_id.unwrap_or(UserId::new(0)),
        username: envelope.username,
    };

    let result = match envelope.request {
        Request::TableCreate {
            table_id,
            name,
            owner,
        } => service.create_table(Table::new_game(table_id, name, owner)).await,
        Request::TableStart { table_id } => service.start_game(table_id).await,
        Request::TableFinish { table_id } => service.finish_game(table_id).await,
        Request::TableArchive {
            table_id,
            database_id,
        } => service.archive_table(table_id, database_id).await.map(|_| ()),
        Request::TableRemove { table_id } => {
            if !service.remove_table(table_id).await {
                session.warning(&format!("Table {table_id} does not exist."));
            }
            Ok(())
        }
        Request::Tag(data) => {
            service.tag_add(&session, data).await;
            Ok(())
        }
        Request::TagDelete(data) => {
            service.tag_delete(&session, data).await;
            Ok(())
        }
        Request::Tags(data) => {
            service.tag_list(&session, data).await;
            Ok(())
        }
        Request::TagSearch(data) => {
            service.tag_search(&session, data).await;
            Ok(())
        }
    };

    if let Err(err) = result {
        if err.is_infrastructure() {
            session.error(&err.user_message());
        } else {
            session.warning(&err.user_message());
        }
    }
}

async fn run<S: TagStore + 'static>(
    store: Arc<S>,
    config: &TablesConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(TableService::new(
        Arc::new(hanabi_tables::TableRegistry::new()),
        store,
        Arc::new(ConsoleChat),
        config,
    ));

    // Each line runs as its own task, like requests from separate connections
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => {
                let service = Arc::clone(&service);
                in_flight.spawn(async move { dispatch(&service, envelope).await });
            }
            Err(err) => tracing::warn!(error = %err, "Ignoring malformed command"),
        }

        // Reap finished commands so the set does not grow without bound
        while let Some(result) = in_flight.try_join_next() {
            if let Err(err) = result {
                tracing::error!(error = %err, "Command task failed");
            }
        }
    }

    tracing::info!(pending = in_flight.len(), "Input closed, waiting for commands");
    while let Some(result) = in_flight.join_next().await {
        if let Err(err) = result {
            tracing::error!(error = %err, "Command task failed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = TablesConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Hanabi table service");

    if let Some(data_dir) = &config.data_dir {
        let store = Arc::new(RocksStore::open(data_dir)?);
        tracing::info!(data_dir = %data_dir.display(), "Initialized RocksDB store");
        run(store, &config).await
    } else {
        tracing::info!("No DATA_DIR set, keeping archived tags in memory");
        run(Arc::new(MemoryStore::new()), &config).await
    }
}
