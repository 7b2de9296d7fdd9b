//! Conversation window builder.
//!
//! Long histories do not fit the engine's context, so anything beyond the
//! trigger threshold gets folded into one synthetic summary message while the
//! most recent exchange stays verbatim. Summarization is best-effort: when it
//! degrades the window is built without it.

use tracing::warn;

use super::enhance::Summarizer;
use crate::domain::conversation::Message;
use crate::ports::EngineMessage;

/// Stored-message count above which older history is summarized.
pub const SUMMARY_TRIGGER: usize = 12;

/// Number of most-recent stored messages always kept verbatim.
pub const KEEP_RECENT: usize = 10;

/// Builds the engine input window from stored history plus the new query.
pub struct ContextWindowBuilder {
    summarizer: Summarizer,
}

impl ContextWindowBuilder {
    pub fn new(summarizer: Summarizer) -> Self {
        Self { summarizer }
    }

    /// Assembles the context window.
    ///
    /// With more than [`SUMMARY_TRIGGER`] stored messages, everything except
    /// the last [`KEEP_RECENT`] is summarized into one system message; the
    /// recent tail and the new user message follow verbatim. At or below the
    /// trigger, all stored messages pass through unchanged.
    pub async fn build(&self, stored: &[Message], new_user_text: &str) -> Vec<EngineMessage> {
        let mut window = Vec::with_capacity(stored.len().min(KEEP_RECENT) + 2);

        if stored.len() > SUMMARY_TRIGGER {
            let split = stored.len() - KEEP_RECENT;
            let (older, recent) = stored.split_at(split);

            let older_refs: Vec<&Message> = older.iter().collect();
            match self.summarizer.summarize(&older_refs).await {
                Ok(summary) => {
                    window.push(EngineMessage::new(
                        crate::domain::conversation::Role::System,
                        format!("Conversation Summary: {summary}"),
                    ));
                }
                Err(degraded) => {
                    // Proceed with the recent tail only.
                    warn!(reason = %degraded.reason, dropped = older.len(), "history summarization degraded");
                }
            }

            window.extend(recent.iter().map(as_engine_message));
        } else {
            window.extend(stored.iter().map(as_engine_message));
        }

        window.push(EngineMessage::new(
            crate::domain::conversation::Role::User,
            new_user_text,
        ));
        window
    }
}

fn as_engine_message(msg: &Message) -> EngineMessage {
    EngineMessage::new(msg.role, msg.content.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::adapters::ai::MockProvider;
    use crate::domain::conversation::Role;

    fn stored(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| Message {
                id: i as i64,
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("msg-{i}"),
                author_id: None,
                created_at: Utc::now(),
                sources: None,
                follow_ups: None,
                images: None,
            })
            .collect()
    }

    fn builder(provider: MockProvider) -> ContextWindowBuilder {
        ContextWindowBuilder::new(Summarizer::new(Arc::new(provider)))
    }

    #[tokio::test]
    async fn short_history_passes_through_verbatim() {
        let builder = builder(MockProvider::failing());
        let window = builder.build(&stored(5), "next question").await;

        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "msg-0");
        assert_eq!(window[5].content, "next question");
        assert_eq!(window[5].role, Role::User);
    }

    #[tokio::test]
    async fn trigger_boundary_is_exclusive() {
        // Exactly 12 stored: no summarization even though the provider works.
        let builder = builder(MockProvider::returning("should not be used"));
        let window = builder.build(&stored(SUMMARY_TRIGGER), "q").await;

        assert_eq!(window.len(), SUMMARY_TRIGGER + 1);
        assert!(window.iter().all(|m| !m.content.starts_with("Conversation Summary:")));
    }

    #[tokio::test]
    async fn long_history_is_summarized() {
        let builder = builder(MockProvider::returning("They discussed Dubai yields."));
        let window = builder.build(&stored(20), "q").await;

        // 1 summary + 10 recent + new query.
        assert_eq!(window.len(), KEEP_RECENT + 2);
        assert_eq!(window[0].role, Role::System);
        assert_eq!(
            window[0].content,
            "Conversation Summary: They discussed Dubai yields."
        );
        // Recent tail is the last KEEP_RECENT messages, in order.
        assert_eq!(window[1].content, "msg-10");
        assert_eq!(window[10].content, "msg-19");
        assert_eq!(window[11].content, "q");
    }

    #[tokio::test]
    async fn degraded_summary_drops_older_history_only() {
        let builder = builder(MockProvider::failing());
        let window = builder.build(&stored(20), "q").await;

        // No summary message; recent tail and query still present.
        assert_eq!(window.len(), KEEP_RECENT + 1);
        assert_eq!(window[0].content, "msg-10");
        assert_eq!(window[KEEP_RECENT].content, "q");
    }
}
