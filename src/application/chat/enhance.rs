//! Optional-enhancement steps: summarization and follow-up suggestion.
//!
//! Both wrap the completion provider and both degrade gracefully: every
//! failure is converted into an explicit [`Degraded`] value so callers decide
//! to proceed without the enhancement instead of silently swallowing errors.

use std::sync::Arc;

use crate::domain::conversation::Message;
use crate::ports::{CompletionProvider, PromptMessage};

/// An optional-enhancement step failed; the caller proceeds without it.
#[derive(Debug, thiserror::Error)]
#[error("enhancement degraded: {reason}")]
pub struct Degraded {
    pub reason: String,
}

impl Degraded {
    fn from_err(err: impl std::fmt::Display) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// Summarizes older history into one text block for the context window.
#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Produces a compact summary of the given messages.
    pub async fn summarize(&self, messages: &[&Message]) -> Result<String, Degraded> {
        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = [
            PromptMessage::system(
                "Summarize the following conversation in a few sentences, \
                 preserving names, figures, and open questions.",
            ),
            PromptMessage::user(transcript),
        ];

        let summary = self
            .provider
            .complete(&prompt)
            .await
            .map_err(Degraded::from_err)?;

        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(Degraded {
                reason: "empty summary".into(),
            });
        }
        Ok(summary)
    }
}

/// Suggests follow-up questions from a completed assistant answer.
#[derive(Clone)]
pub struct FollowUpSuggester {
    provider: Arc<dyn CompletionProvider>,
}

impl FollowUpSuggester {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Generates up to three short follow-up questions.
    pub async fn suggest(&self, answer: &str) -> Result<Vec<String>, Degraded> {
        let prompt = [
            PromptMessage::system(
                "Based on the assistant's last answer, suggest 3 short and helpful \
                 follow-up questions the user might naturally ask next. \
                 Format as a numbered list.",
            ),
            PromptMessage::user(answer.to_string()),
        ];

        let raw = self
            .provider
            .complete(&prompt)
            .await
            .map_err(Degraded::from_err)?;

        Ok(parse_numbered_list(&raw))
    }
}

/// Strips list markers ("1.", "-", etc.) and blank lines from LLM output.
fn parse_numbered_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == ' ')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a greeting, personalized when a first name is known. Used by the
/// chat-boot flow; failure falls back to [`DEFAULT_GREETING`] at the caller.
pub struct Greeter {
    provider: Arc<dyn CompletionProvider>,
}

/// Canned greeting used when the LLM call fails.
pub const DEFAULT_GREETING: &str = "Hello! How can I assist you today?";

impl Greeter {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Returns the greeting system prompt and the generated greeting text.
    pub async fn greet(&self, fname: Option<&str>) -> (String, Result<String, Degraded>) {
        let system_prompt = match fname {
            Some(name) => format!("The user's name is {name}. Greet them personally."),
            None => "Greet the user warmly without mentioning their name.".to_string(),
        };

        let result = self
            .provider
            .complete(&[PromptMessage::system(system_prompt.clone())])
            .await
            .map(|s| s.trim().to_string())
            .map_err(Degraded::from_err);

        (system_prompt, result)
    }
}
