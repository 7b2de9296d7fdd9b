//! PostgreSQL persistence adapters.

mod conversation_store;

pub use conversation_store::PostgresConversationStore;
