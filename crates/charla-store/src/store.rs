use charla_core::ids::ConversationId;
use charla_core::turns::Session;

use crate::error::StoreError;

/// Durable key-value storage of conversation histories, keyed by
/// conversation id.
///
/// Contract shared by all backends:
/// - `load` returns `Ok(None)` for a never-seen id — the expected new-user
///   path, not an error. A record that exists but no longer decodes is
///   `StoreError::MalformedHistory`.
/// - `save` is an atomic upsert: exactly one record per id, overwritten in a
///   single round trip.
/// - `clear` is idempotent; clearing an absent id succeeds.
///
/// Every call performs exactly one storage round trip. There is no caching
/// layer: every `load` observes the latest `save` from any task.
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &ConversationId) -> Result<Option<Session>, StoreError>;
    fn save(&self, id: &ConversationId, session: &Session) -> Result<(), StoreError>;
    fn clear(&self, id: &ConversationId) -> Result<(), StoreError>;
}
