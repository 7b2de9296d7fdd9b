//! Mock completion provider for tests and local development.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{AIError, CompletionProvider, PromptMessage};

/// Configurable in-memory provider: returns one canned response or one
/// canned error, and records every call for verification.
#[derive(Clone)]
pub struct MockProvider {
    response: Option<String>,
    calls: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
}

impl MockProvider {
    /// A provider that always returns `content`.
    pub fn returning(content: impl Into<String>) -> Self {
        Self {
            response: Some(content.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider whose every call fails with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            response: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded prompts.
    pub fn calls(&self) -> Vec<Vec<PromptMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AIError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        match &self.response {
            Some(content) => Ok(content.clone()),
            None => Err(AIError::Unavailable("mock failure".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_canned_response_and_tracks_calls() {
        let provider = MockProvider::returning("hello");

        let out = provider.complete(&[PromptMessage::user("hi")]).await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.calls()[0][0].content, "hi");
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let provider = MockProvider::failing();
        let result = provider.complete(&[]).await;
        assert!(matches!(result, Err(AIError::Unavailable(_))));
    }
}
