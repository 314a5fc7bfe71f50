use dashmap::DashMap;
use tracing::instrument;

use charla_core::codec;
use charla_core::ids::ConversationId;
use charla_core::turns::Session;

use crate::error::StoreError;
use crate::store::SessionStore;

/// Volatile in-process backend. Holds the same encoded form the durable
/// backends persist, so the codec path is exercised identically.
///
/// Used for tests and single-process dev runs; state dies with the process.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for MemoryStore {
    #[instrument(skip(self), fields(conversation_id = %id))]
    fn load(&self, id: &ConversationId) -> Result<Option<Session>, StoreError> {
        match self.records.get(id.as_str()) {
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
        self.records
            .insert(id.as_str().to_owned(), codec::encode(&session.turns));
        Ok(())
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    fn clear(&self, id: &ConversationId) -> Result<(), StoreError> {
        self.records.remove(id.as_str());
        Ok(())
    }
}
