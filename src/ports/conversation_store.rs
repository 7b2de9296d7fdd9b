//! Conversation store port: durable keyed append-log of messages.
//!
//! # Design
//!
//! - **Implicit creation**: appending to an unknown session key creates the
//!   conversation; implementations must use an atomic insert-or-get so that
//!   concurrent first-appends never produce duplicate conversation records.
//! - **Append-time stamping**: messages are timestamped by the store, which
//!   makes `(created_at, id)` a deterministic replay order.
//! - **Atomic reads**: `get` must never return a conversation with a
//!   truncated message list.

use async_trait::async_trait;

use crate::domain::conversation::{Conversation, NewMessage};

/// Port for conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetches a conversation with its full ordered message list, or `None`
    /// for an unknown session key.
    async fn get(&self, session_key: &str) -> Result<Option<Conversation>, StoreError>;

    /// Appends messages in order, creating the conversation if absent.
    ///
    /// Empty input is a no-op. Messages with empty content are skipped;
    /// empty content is never persisted.
    async fn append(&self, session_key: &str, messages: &[NewMessage]) -> Result<(), StoreError>;

    /// Idempotently marks the conversation greeted, sets the display name,
    /// and replaces the entire message list with the greeting messages.
    ///
    /// This is a destructive reset used only by the first-contact greeting
    /// flow.
    async fn upsert_greeting(
        &self,
        session_key: &str,
        display_name: Option<&str>,
        messages: &[NewMessage],
    ) -> Result<(), StoreError>;
}

/// Conversation store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ConversationStore) {}
    }
}
