//! Agent engine port: the reasoning component that answers a query.
//!
//! The engine is an opaque external capability: it accepts an ordered message
//! list plus a thread key and produces an async stream of raw events (model
//! tokens, tool invocations, tool results). This port specifies only that
//! event contract; normalization into the closed internal event set happens
//! downstream in the chat pipeline.
//!
//! # Resource discipline
//!
//! Dropping the returned stream MUST cancel the underlying run and release
//! the model/tool execution context. The chat pipeline relies on this: every
//! exit path (completion, error, client disconnect) drops the stream.

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::pin::Pin;

use crate::domain::conversation::Role;

/// One raw event from the agent engine.
///
/// `event` is the engine's native event-type tag, `node` identifies the
/// pipeline stage that emitted it, `name` is the tool name for tool events,
/// and `data` is a payload whose shape depends on the event type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentEvent {
    pub event: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl AgentEvent {
    /// Creates an event with no node or tool name (useful in tests).
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            node: None,
            name: None,
            data,
        }
    }

    /// Sets the emitting node.
    pub fn from_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Sets the tool name.
    pub fn for_tool(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A message handed to the engine as LLM input context.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EngineMessage {
    pub role: Role,
    pub content: String,
}

impl EngineMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The engine's event stream. Items surface transport or model failures as
/// `Err`; the stream ends after the run completes or fails.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, EngineError>> + Send>>;

/// Port for the external reasoning engine.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Starts a run for the given context and returns its event stream.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the run cannot be started at all (the
    /// MODEL_INIT_ERROR path); failures mid-run arrive as stream items.
    async fn run(
        &self,
        thread_key: &str,
        messages: Vec<EngineMessage>,
    ) -> Result<AgentEventStream, EngineError>;
}

/// Agent engine failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The run could not be started.
    #[error("engine initialization failed: {0}")]
    Init(String),

    /// Transport failure while consuming the event stream.
    #[error("engine stream failed: {0}")]
    Stream(String),

    /// The engine returned a payload we could not decode.
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_engine_is_object_safe() {
        fn _accepts_dyn(_engine: &dyn AgentEngine) {}
    }

    #[test]
    fn event_builder_sets_node_and_tool() {
        let event = AgentEvent::new("tool_start", json!({"input": "q"}))
            .from_node("tools")
            .for_tool("web_search");

        assert_eq!(event.node.as_deref(), Some("tools"));
        assert_eq!(event.name.as_deref(), Some("web_search"));
    }

    #[test]
    fn deserializes_minimal_wire_event() {
        let event: AgentEvent =
            serde_json::from_str(r#"{"event":"model_stream","data":{"chunk":"hi"}}"#).unwrap();
        assert_eq!(event.event, "model_stream");
        assert!(event.node.is_none());
        assert_eq!(event.data["chunk"], "hi");
    }
}
