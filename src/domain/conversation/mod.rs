//! Conversation domain model.
//!
//! Conversations are keyed append-logs of messages. The aggregate here is
//! deliberately thin: ordering and idempotent creation are enforced by the
//! store adapters, and the streaming pipeline only ever appends.

mod conversation;
mod message;
mod sources;

pub use conversation::Conversation;
pub use message::{Message, NewMessage, Role};
pub use sources::{DbResultPayload, SourceBundle, WebSources};
