//! Completion provider port: single-shot LLM completions.
//!
//! The chat pipeline uses this for its auxiliary synthesis steps: history
//! summarization, follow-up suggestion, greeting generation, and the optional
//! investment-score explanation. The main answer stream comes from the agent
//! engine, not from here.

use async_trait::async_trait;

use crate::domain::conversation::Role;

/// One prompt message for a completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Port for single-shot LLM completions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generates one completion for the given prompt.
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AIError>;
}

/// Completion provider failures.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    /// Provider returned a server-side failure.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Request rejected as invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AIError {
    /// True if a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
                | AIError::Unavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn CompletionProvider) {}
    }

    #[test]
    fn retryable_classification() {
        assert!(AIError::RateLimited { retry_after_secs: 30 }.is_retryable());
        assert!(AIError::Network("reset".into()).is_retryable());
        assert!(AIError::Timeout { timeout_secs: 60 }.is_retryable());
        assert!(AIError::Unavailable("503".into()).is_retryable());

        assert!(!AIError::AuthenticationFailed.is_retryable());
        assert!(!AIError::Parse("bad json".into()).is_retryable());
        assert!(!AIError::InvalidRequest("empty".into()).is_retryable());
    }
}
