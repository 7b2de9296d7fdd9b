//! Persistence finalizer.
//!
//! Runs once per request after the stream completes: writes the user's
//! message followed by the assistant turn in one append call. By the time
//! this runs the response has already been delivered, so a store failure is
//! logged and surfaced only as a missing history entry on next load.

use std::sync::Arc;

use tracing::warn;

use super::aggregator::StreamAggregate;
use crate::domain::conversation::NewMessage;
use crate::ports::ConversationStore;

pub struct PersistenceFinalizer {
    store: Arc<dyn ConversationStore>,
}

impl PersistenceFinalizer {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Appends the completed turn: user message first, then the assistant
    /// message carrying final text, sources, and follow-ups.
    pub async fn persist(
        &self,
        session_key: &str,
        user_message: NewMessage,
        aggregate: &StreamAggregate,
    ) {
        let assistant = NewMessage::assistant(aggregate.final_text.clone())
            .with_sources(aggregate.sources.clone())
            .with_follow_ups(aggregate.follow_ups.clone());

        if assistant.is_empty() {
            warn!(session_key, "skipping persistence of empty assistant turn");
            return;
        }

        if let Err(err) = self
            .store
            .append(session_key, &[user_message, assistant])
            .await
        {
            warn!(session_key, error = %err, "failed to persist completed turn");
        }
    }
}
