//! Scripted agent engine for tests and local development.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::ports::{AgentEngine, AgentEvent, AgentEventStream, EngineError, EngineMessage};

/// Replays a canned event script once; later runs yield an empty stream.
/// Records the message window of every run for assertions.
pub struct ScriptedAgentEngine {
    script: Mutex<Option<Vec<Result<AgentEvent, EngineError>>>>,
    received: Mutex<Vec<Vec<EngineMessage>>>,
    init_failure: Option<String>,
}

impl ScriptedAgentEngine {
    pub fn new(script: Vec<Result<AgentEvent, EngineError>>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            received: Mutex::new(Vec::new()),
            init_failure: None,
        }
    }

    /// An engine whose every run fails to start.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            init_failure: Some(reason.into()),
        }
    }

    /// The message windows received so far, one entry per run.
    pub fn received(&self) -> Vec<Vec<EngineMessage>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentEngine for ScriptedAgentEngine {
    async fn run(
        &self,
        _thread_key: &str,
        messages: Vec<EngineMessage>,
    ) -> Result<AgentEventStream, EngineError> {
        self.received.lock().unwrap().push(messages);

        if let Some(reason) = &self.init_failure {
            return Err(EngineError::Init(reason.clone()));
        }

        let events = self.script.lock().unwrap().take().unwrap_or_default();
        Ok(Box::pin(stream::iter(events)))
    }
}
