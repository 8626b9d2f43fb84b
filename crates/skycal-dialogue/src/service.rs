//! Per-message entry point.
//!
//! [`DialogueService::handle_message`] is what transports call.  One call is
//! one turn: the conversation is locked, expired clarifications are swept,
//! the message is routed either to the resolver or to a fresh workflow run,
//! and the resulting context update is applied at the very end.  A turn
//! that fails or panics leaves the store exactly as it found it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::config::DialogueConfig;
use crate::context::{ClarificationStore, ConversationId};
use crate::error::Result;
use crate::replies;
use crate::resolver::{ClarificationResolver, ContextUpdate, looks_like_new_request};
use crate::traits::{CalendarWriter, IntentExtractor, WeatherProvider};
use crate::workflow::{TurnState, WorkflowEngine};

/// The text sent back for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// The reply asks the user a question.
    pub needs_clarification: bool,
}

impl Reply {
    /// The fixed apology sent when a turn fails internally.
    pub fn internal_error() -> Self {
        Self {
            text: replies::INTERNAL_ERROR.to_owned(),
            needs_clarification: false,
        }
    }
}

/// Orchestrates turns across conversations.
pub struct DialogueService {
    engine: Arc<WorkflowEngine>,
    resolver: ClarificationResolver,
    store: Arc<ClarificationStore>,
}

impl DialogueService {
    pub fn new(engine: WorkflowEngine, store: Arc<ClarificationStore>) -> Self {
        let engine = Arc::new(engine);
        Self {
            resolver: ClarificationResolver::new(Arc::clone(&engine)),
            engine,
            store,
        }
    }

    /// Wire the service from collaborators and configuration.
    pub fn from_config(
        extractor: Arc<dyn IntentExtractor>,
        weather: Arc<dyn WeatherProvider>,
        calendar: Arc<dyn CalendarWriter>,
        config: &DialogueConfig,
    ) -> Self {
        let engine = WorkflowEngine::new(extractor, weather, calendar, config);
        let store = Arc::new(ClarificationStore::new(config.pending_ttl()));
        Self::new(engine, store)
    }

    pub fn store(&self) -> &ClarificationStore {
        &self.store
    }

    /// Handle one inbound message using the local wall clock.
    pub async fn handle_message(&self, conversation_id: ConversationId, text: &str) -> Reply {
        let now = chrono::Local::now().naive_local();
        self.handle_message_at(conversation_id, text, now).await
    }

    /// Handle one inbound message as if it arrived at `now`.
    pub async fn handle_message_at(
        &self,
        conversation_id: ConversationId,
        text: &str,
        now: NaiveDateTime,
    ) -> Reply {
        let _guard = self.store.lock(conversation_id).await;
        tracing::info!(conversation_id = %conversation_id, message = %text, "processing message");

        let turn = AssertUnwindSafe(self.run_turn(conversation_id, text, now))
            .catch_unwind()
            .await;

        match turn {
            Ok(Ok((reply, update))) => {
                self.apply(conversation_id, update);
                reply
            }
            Ok(Err(e)) => {
                tracing::error!(conversation_id = %conversation_id, error = %e, "turn failed");
                Reply::internal_error()
            }
            Err(_) => {
                tracing::error!(conversation_id = %conversation_id, "turn panicked");
                Reply::internal_error()
            }
        }
    }

    async fn run_turn(
        &self,
        conversation_id: ConversationId,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<(Reply, ContextUpdate)> {
        let swept = self.store.sweep_expired(now);
        if swept > 0 {
            tracing::debug!(
                swept,
                ttl_secs = self.store.ttl().num_seconds(),
                "expired clarifications removed"
            );
        }

        if let Some(pending) = self.store.get(conversation_id) {
            if !looks_like_new_request(text) {
                let resolution = self
                    .resolver
                    .resolve(conversation_id, &pending, text, now)
                    .await?;
                let reply = Reply {
                    text: resolution.text,
                    needs_clarification: resolution.needs_clarification,
                };
                return Ok((reply, resolution.update));
            }
            tracing::info!(
                conversation_id = %conversation_id,
                "new request overrides pending clarification"
            );
        }

        let outcome = self
            .engine
            .run(TurnState::new(conversation_id, text), now)
            .await;
        let update = ContextUpdate::from_pending(outcome.pending_clarification(now));
        let reply = Reply {
            text: outcome.state.response_text,
            needs_clarification: outcome.state.needs_clarification,
        };
        Ok((reply, update))
    }

    fn apply(&self, conversation_id: ConversationId, update: ContextUpdate) {
        match update {
            ContextUpdate::Keep => {}
            ContextUpdate::Clear => {
                self.store.remove(conversation_id);
            }
            ContextUpdate::Replace(pending) => self.store.put(conversation_id, pending),
        }
    }
}
