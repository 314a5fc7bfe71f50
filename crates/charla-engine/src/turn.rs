//! Per-message turn processing.
//!
//! One inbound message drives one cycle: load-or-seed the session, append the
//! user turn, persist, assemble the prompt from the persisted window, call
//! the provider, append the reply, persist again. Turns for the same
//! conversation id are serialized through a per-id mutex so two
//! near-simultaneous messages cannot overwrite each other's appended turn.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use charla_core::ids::ConversationId;
use charla_core::provider::ChatProvider;
use charla_core::turns::{Session, Turn};
use charla_store::SessionStore;

use crate::context;
use crate::error::TurnError;
use crate::knowledge::KnowledgeSource;
use crate::registry::{TenantConfig, TenantRegistry};

pub struct TurnOrchestrator {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn ChatProvider>,
    registry: Arc<TenantRegistry>,
    knowledge: KnowledgeSource,
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn ChatProvider>,
        registry: Arc<TenantRegistry>,
    ) -> Self {
        Self {
            store,
            provider,
            registry,
            knowledge: KnowledgeSource::new(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().clone()
    }

    /// Process one inbound message and return the generated reply.
    ///
    /// A failure after the user turn is persisted leaves the session with the
    /// user's message and no reply; the next inbound message re-enters the
    /// same flow with that session as input, so nothing is lost.
    #[instrument(skip(self, message_text), fields(tenant = tenant_key, conversation_id = %id, name = display_name))]
    pub async fn respond(
        &self,
        tenant_key: &str,
        id: &ConversationId,
        display_name: &str,
        message_text: &str,
    ) -> Result<String, TurnError> {
        let tenant = self.registry.resolve(tenant_key);

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut session = self.load_or_seed(id, &tenant)?;
        session.push_user(message_text);
        self.store.save(id, &session)?;

        // Assemble from the persisted record, not the in-memory copy, so the
        // window reflects anything another process wrote in the meantime.
        let session = match self.store.load(id) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => session,
            Err(e) if e.is_malformed_history() => session,
            Err(e) => return Err(e.into()),
        };

        let knowledge = self.knowledge.fetch_or_empty(&tenant.knowledge).await;
        let prompt = context::assemble(
            &tenant.persona,
            &knowledge,
            &session.turns,
            tenant.history_window,
        );

        let reply = match self.provider.complete(&prompt, &tenant.generation).await {
            Ok(reply) => reply,
            Err(e) => {
                // Abort without appending: the persisted session keeps the
                // user's turn, and no partial assistant turn is ever written.
                warn!(error = %e, kind = e.error_kind(), "generation failed, aborting turn");
                return Err(e.into());
            }
        };

        let mut session = session;
        session.push_assistant(&reply);
        self.store.save(id, &session)?;

        info!(turns = session.turns.len(), "turn persisted");
        Ok(reply)
    }

    /// The persisted turn list for a conversation; empty when absent or
    /// unreadable.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub fn history(&self, id: &ConversationId) -> Result<Vec<Turn>, TurnError> {
        match self.store.load(id) {
            Ok(Some(session)) => Ok(session.turns),
            Ok(None) => Ok(Vec::new()),
            Err(e) if e.is_malformed_history() => {
                warn!(error = %e, "unreadable history treated as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Administrative clear. Idempotent; takes the per-id lock so it cannot
    /// interleave with a turn in flight.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub async fn clear(&self, id: &ConversationId) -> Result<(), TurnError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.store.clear(id)?;
        Ok(())
    }

    fn load_or_seed(
        &self,
        id: &ConversationId,
        tenant: &TenantConfig,
    ) -> Result<Session, TurnError> {
        match self.store.load(id) {
            Ok(Some(session)) => {
                info!("retrieved existing session");
                Ok(session)
            }
            Ok(None) => self.seed(id, tenant),
            Err(e) if e.is_malformed_history() => {
                // A corrupt record must not brick the conversation.
                warn!(error = %e, "discarding unreadable history, starting fresh");
                self.seed(id, tenant)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn seed(&self, id: &ConversationId, tenant: &TenantConfig) -> Result<Session, TurnError> {
        info!("creating new session");
        let session = Session::seeded(id.clone(), &tenant.greeting);
        // Persist the minimal session immediately so concurrent reads observe
        // a consistent seed.
        self.store.save(id, &session)?;
        Ok(session)
    }
}
