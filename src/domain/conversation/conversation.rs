//! Conversation aggregate: one session's metadata plus its ordered messages.

use serde::{Deserialize, Serialize};

use super::message::Message;

/// A stored conversation, identified by an opaque session key.
///
/// # Invariants
///
/// - Created implicitly on first append (`greeted = false`, no display name)
/// - `greeted` transitions false→true exactly once, via the greeting upsert
/// - `messages` are totally ordered by `(created_at, id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque session key (the caller's user id in the current deployment).
    pub session_key: String,
    /// Whether the first-contact greeting has been delivered.
    pub greeted: bool,
    /// Display name captured during the greeting flow.
    pub display_name: Option<String>,
    /// Messages in replay order.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Messages with non-empty content, as (role, content) pairs, the shape
    /// fed to the context window builder.
    pub fn dialogue(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.content.trim().is_empty())
    }
}
