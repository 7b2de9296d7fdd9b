//! Ports: interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! application core and the outside world; adapters implement them.
//!
//! - [`AgentEngine`]: the external reasoning engine (event-stream contract)
//! - [`ConversationStore`]: durable conversation persistence
//! - [`CompletionProvider`]: single-shot LLM completions for auxiliary steps

mod agent_engine;
mod completion_provider;
mod conversation_store;

pub use agent_engine::{AgentEngine, AgentEvent, AgentEventStream, EngineError, EngineMessage};
pub use completion_provider::{AIError, CompletionProvider, PromptMessage};
pub use conversation_store::{ConversationStore, StoreError};
