//! Message entities for conversations.
//!
//! A [`Message`] is an immutable, persisted record of one user/assistant/system
//! exchange. A [`NewMessage`] is the unpersisted form: it has no id and no
//! timestamp; both are assigned by the store at append time, which is what
//! guarantees the (created_at, id) total order within a conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sources::SourceBundle;

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (summaries, greeting prompts).
    System,
    /// User input.
    User,
    /// AI assistant response.
    Assistant,
}

impl Role {
    /// Stable string form used in the database and wire DTOs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parses a stored role string. Unknown values map to `System` so a
    /// corrupt row degrades to an invisible message rather than a load error.
    pub fn parse(s: &str) -> Role {
        match s {
            "user" | "human" => Role::User,
            "assistant" | "ai" => Role::Assistant,
            _ => Role::System,
        }
    }
}

/// A persisted message within a conversation.
///
/// # Invariants
///
/// - `content` is non-empty (empty content is rejected before persistence)
/// - `(created_at, id)` gives a deterministic total order within a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Row id; tie-breaker for messages sharing a timestamp.
    pub id: i64,
    /// Who sent this message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Authoring user, only meaningful for user-authored messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    /// Append timestamp, assigned by the store.
    pub created_at: DateTime<Utc>,
    /// Citation bundle attached to assistant messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourceBundle>,
    /// Suggested follow-up questions attached to assistant messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_ups: Option<Vec<String>>,
    /// Image-result bundle, stored as opaque JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<serde_json::Value>,
}

/// A message that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourceBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_ups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<serde_json::Value>,
}

impl NewMessage {
    /// Creates a bare message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            author_id: None,
            sources: None,
            follow_ups: None,
            images: None,
        }
    }

    /// Creates a user message authored by `author_id`.
    pub fn user(content: impl Into<String>, author_id: Option<String>) -> Self {
        Self {
            author_id,
            ..Self::new(Role::User, content)
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attaches a citation bundle.
    pub fn with_sources(mut self, sources: SourceBundle) -> Self {
        if !sources.is_empty() {
            self.sources = Some(sources);
        }
        self
    }

    /// Attaches follow-up suggestions.
    pub fn with_follow_ups(mut self, follow_ups: Vec<String>) -> Self {
        if !follow_ups.is_empty() {
            self.follow_ups = Some(follow_ups);
        }
        self
    }

    /// True if this message carries no text and must not be persisted.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod roles {
        use super::*;

        #[test]
        fn round_trips_canonical_strings() {
            for role in [Role::System, Role::User, Role::Assistant] {
                assert_eq!(Role::parse(role.as_str()), role);
            }
        }

        #[test]
        fn accepts_legacy_aliases() {
            assert_eq!(Role::parse("ai"), Role::Assistant);
            assert_eq!(Role::parse("human"), Role::User);
        }

        #[test]
        fn unknown_degrades_to_system() {
            assert_eq!(Role::parse("tool"), Role::System);
        }

        #[test]
        fn serializes_lowercase() {
            assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        }
    }

    mod new_message {
        use super::*;

        #[test]
        fn user_constructor_sets_author() {
            let msg = NewMessage::user("hi", Some("u-1".into()));
            assert_eq!(msg.role, Role::User);
            assert_eq!(msg.author_id.as_deref(), Some("u-1"));
        }

        #[test]
        fn whitespace_only_content_is_empty() {
            assert!(NewMessage::assistant("  \n ").is_empty());
            assert!(!NewMessage::assistant("ok").is_empty());
        }

        #[test]
        fn empty_follow_ups_are_dropped() {
            let msg = NewMessage::assistant("answer").with_follow_ups(vec![]);
            assert!(msg.follow_ups.is_none());
        }

        #[test]
        fn empty_source_bundle_is_dropped() {
            let msg = NewMessage::assistant("answer").with_sources(SourceBundle::default());
            assert!(msg.sources.is_none());
        }
    }
}
