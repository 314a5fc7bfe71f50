use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{info, instrument};

use charla_core::codec;
use charla_core::ids::ConversationId;
use charla_core::turns::Session;

use crate::error::StoreError;
use crate::store::SessionStore;

const SCHEMA_VERSION: u32 = 1;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS chat_history (
    conversation_id TEXT PRIMARY KEY,
    history TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;

/// Relational backend over a thread-safe SQLite connection.
/// Uses parking_lot::Mutex for synchronous access (rusqlite is not Sync).
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn, path.to_owned())
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(PRAGMAS)
            .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

        let version: Option<u32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();
        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;
        }

        info!(path = %path.display(), "chat history database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

impl SessionStore for SqliteStore {
    #[instrument(skip(self), fields(conversation_id = %id))]
    fn load(&self, id: &ConversationId) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT history FROM chat_history WHERE conversation_id = ?1")?;
        let mut rows = stmt.query([id.as_str()])?;

        match rows.next()? {
            Some(row) => {
                let raw: String = row.get(0)?;
                let turns = codec::decode_str(&raw)
                    .map_err(|e| StoreError::malformed(id.as_str(), e))?;
                Ok(Some(Session {
                    id: id.clone(),
                    turns,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session), fields(conversation_id = %id, turns = session.turns.len()))]
    fn save(&self, id: &ConversationId, session: &Session) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chat_history (conversation_id, history, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 history = excluded.history,
                 updated_at = excluded.updated_at",
            rusqlite::params![id.as_str(), codec::encode(&session.turns), now],
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    fn clear(&self, id: &ConversationId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM chat_history WHERE conversation_id = ?1",
            [id.as_str()],
        )?;
        Ok(())
    }
}
