use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{info, instrument};

use charla_core::codec;
use charla_core::ids::ConversationId;
use charla_core::turns::Session;

use crate::error::StoreError;
use crate::store::SessionStore;

const HISTORY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("chat_history");

/// Key-value backend over redb. Fills the cache-style deployment slot where
/// the relational store is overkill: one key per conversation id, the encoded
/// history as the value.
pub struct KvStore {
    db: Arc<Database>,
}

impl KvStore {
    /// Open or create a database file at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }
        let db = Database::create(path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(Arc::new(db), path)
    }

    fn init(db: Arc<Database>, path: &Path) -> Result<Self, StoreError> {
        // Create the table up front so reads never race table creation.
        let write_txn = db.begin_write()?;
        write_txn.open_table(HISTORY_TABLE)?;
        write_txn.commit()?;

        info!(path = %path.display(), "chat history kv store opened");
        Ok(Self { db })
    }
}

impl SessionStore for KvStore {
    #[instrument(skip(self), fields(conversation_id = %id))]
    fn load(&self, id: &ConversationId) -> Result<Option<Session>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;

        match table.get(id.as_str())? {
            Some(raw) => {
                let turns = codec::decode_str(raw.value())
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
        let encoded = codec::encode(&session.turns);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            table.insert(id.as_str(), encoded.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    fn clear(&self, id: &ConversationId) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            table.remove(id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    fn setup() -> (KvStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(&dir.path().join("chat.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn satisfies_store_contract() {
        let (store, _dir) = setup();
        contract::exercise_all(&store);
    }

    #[test]
    fn corrupt_value_surfaces_malformed_history() {
        let (store, _dir) = setup();
        let id = ConversationId::from_raw("5491112345678");

        let write_txn = store.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(HISTORY_TABLE).unwrap();
            table.insert(id.as_str(), "]]not json").unwrap();
        }
        write_txn.commit().unwrap();

        let result = store.load(&id);
        assert!(matches!(result, Err(StoreError::MalformedHistory { .. })));
    }

    #[test]
    fn reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.redb");
        let id = ConversationId::from_raw("5491112345678");

        {
            let store = KvStore::open(&path).unwrap();
            store
                .save(&id, &Session::seeded(id.clone(), "seed"))
                .unwrap();
        }

        let store = KvStore::open(&path).unwrap();
        let session = store.load(&id).unwrap().expect("persisted across reopen");
        assert_eq!(session.turns[0].content, "seed");
    }
}
