//! Streaming aggregator: the per-request pipeline.
//!
//! One cooperative task per request: it loads history, builds the context
//! window, runs the agent engine, and consumes the normalized event stream,
//! emitting the typed SSE protocol while accumulating the final assistant
//! turn for persistence. Every request resolves to exactly one
//! [`StreamOutcome`], and the engine stream handle is dropped on every exit
//! path so the underlying run is always cancelled with it.
//!
//! A failed channel send means the client disconnected. Disconnects are not
//! failures: nothing further is emitted, the aggregate is discarded, and the
//! in-flight assistant turn is not persisted.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, warn};

use super::enhance::FollowUpSuggester;
use super::finalizer::PersistenceFinalizer;
use super::normalizer::{normalize, NormalizedEvent};
use super::protocol::{ErrorCode, StreamMessage};
use super::window::ContextWindowBuilder;
use crate::domain::conversation::{DbResultPayload, NewMessage, SourceBundle, WebSources};
use crate::ports::{AgentEngine, ConversationStore};

/// Checkpoint key used when no user id accompanies the request. Anonymous
/// runs load no history and persist nothing; their transcript lives
/// client-side until synced after login.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Search engine name surfaced in web-search events.
const SEARCH_ENGINE: &str = "tavily";

/// Tool-name markers used to route tool events.
const WEB_SEARCH_MARKER: &str = "web_search";

/// Terminal state of one streamed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Stream ended normally; the turn was persisted and `end` was emitted.
    Completed,
    /// A fatal failure was reported to the client as one `error` event.
    Failed(ErrorCode),
    /// The client disconnected; nothing was emitted or persisted after that.
    Cancelled,
}

/// In-memory accumulation of one assistant turn. Owned by the pipeline for
/// the lifetime of one request, consumed by the finalizer on completion.
#[derive(Debug, Clone, Default)]
pub struct StreamAggregate {
    /// Append-only concatenation of streamed tokens.
    pub text: String,
    /// Snapshot of `text` taken at the text-complete marker.
    pub final_text: String,
    pub sources: SourceBundle,
    pub follow_ups: Vec<String>,
}

/// The client went away; the current request stops silently.
struct Disconnected;

pub struct ChatPipeline {
    engine: Arc<dyn AgentEngine>,
    store: Arc<dyn ConversationStore>,
    window: ContextWindowBuilder,
    suggester: FollowUpSuggester,
    finalizer: PersistenceFinalizer,
}

impl ChatPipeline {
    pub fn new(
        engine: Arc<dyn AgentEngine>,
        store: Arc<dyn ConversationStore>,
        window: ContextWindowBuilder,
        suggester: FollowUpSuggester,
    ) -> Self {
        let finalizer = PersistenceFinalizer::new(store.clone());
        Self {
            engine,
            store,
            window,
            suggester,
            finalizer,
        }
    }

    /// Runs one chat request end to end, writing protocol events to `tx`.
    ///
    /// Requests without a user id run against a fresh context and are never
    /// persisted.
    pub async fn run(
        &self,
        user_id: Option<&str>,
        query: &str,
        tx: mpsc::Sender<StreamMessage>,
    ) -> StreamOutcome {
        let session_key = user_id.unwrap_or(ANONYMOUS_KEY);

        let stored = match user_id {
            Some(_) => match self.store.get(session_key).await {
                Ok(conversation) => conversation.map(|c| c.messages).unwrap_or_default(),
                Err(err) => {
                    error!(session_key, error = %err, "history load failed");
                    return self.fail(&tx, ErrorCode::DatabaseError).await;
                }
            },
            // Anonymous visitors share the checkpoint label but never a
            // stored conversation.
            None => Vec::new(),
        };

        let window = self.window.build(&stored, query).await;

        let mut events = match self.engine.run(session_key, window).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(session_key, error = %err, "agent engine failed to start");
                return self.fail(&tx, ErrorCode::ModelInitError).await;
            }
        };

        let mut aggregate = StreamAggregate::default();

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(err) => {
                    warn!(session_key, error = %err, "agent stream failed mid-run");
                    drop(events);
                    return self.fail_classified(&tx, &err.to_string()).await;
                }
            };

            for normalized in normalize(event) {
                if self
                    .apply(normalized, &mut aggregate, session_key, &tx)
                    .await
                    .is_err()
                {
                    return StreamOutcome::Cancelled;
                }
            }
        }
        drop(events);

        if !aggregate.text.is_empty() {
            // A run that never reported model_end still ends with a usable
            // answer; snapshot it so persistence sees the full text.
            if aggregate.final_text.is_empty() {
                aggregate.final_text = aggregate.text.clone();
            }

            // The client can hang up between the last stream event and the
            // terminal work; a closed channel is a disconnect, not a
            // completion.
            if tx.is_closed() {
                return StreamOutcome::Cancelled;
            }

            match self.suggester.suggest(&aggregate.final_text).await {
                Ok(items) if !items.is_empty() => {
                    aggregate.follow_ups = items.clone();
                    if send(&tx, StreamMessage::Followup { items }).await.is_err() {
                        return StreamOutcome::Cancelled;
                    }
                }
                Ok(_) => {}
                Err(degraded) => {
                    warn!(session_key, reason = %degraded.reason, "follow-up generation degraded");
                }
            }

            if tx.is_closed() {
                return StreamOutcome::Cancelled;
            }

            if user_id.is_some() {
                let user_message = NewMessage::user(query, user_id.map(str::to_string));
                self.finalizer
                    .persist(session_key, user_message, &aggregate)
                    .await;
            }
        }

        if send(&tx, StreamMessage::End).await.is_err() {
            return StreamOutcome::Cancelled;
        }
        StreamOutcome::Completed
    }

    /// Handles one normalized event: emit protocol events, mutate the
    /// aggregate. `Err` means the client disconnected.
    async fn apply(
        &self,
        event: NormalizedEvent,
        aggregate: &mut StreamAggregate,
        session_key: &str,
        tx: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), Disconnected> {
        match event {
            NormalizedEvent::StageChanged(stage) => {
                send(tx, StreamMessage::Stage { stage }).await
            }

            NormalizedEvent::Token(token) => {
                aggregate.text.push_str(&token);
                send(tx, StreamMessage::Content { content: token }).await
            }

            NormalizedEvent::TextComplete => {
                aggregate.final_text = aggregate.text.clone();
                send(
                    tx,
                    StreamMessage::Checkpoint {
                        checkpoint_id: session_key.to_string(),
                    },
                )
                .await
            }

            NormalizedEvent::ToolInvoked { name, input } if name.contains(WEB_SEARCH_MARKER) => {
                let query = input
                    .get("query")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                send(
                    tx,
                    StreamMessage::SearchStart {
                        query,
                        engine: SEARCH_ENGINE.to_string(),
                    },
                )
                .await
            }
            NormalizedEvent::ToolInvoked { .. } => Ok(()),

            NormalizedEvent::ToolCompleted { name, output } if name.contains(WEB_SEARCH_MARKER) => {
                let urls = extract_result_urls(&output);
                aggregate.sources.web = Some(WebSources {
                    engine: SEARCH_ENGINE.to_string(),
                    urls: urls.clone(),
                });
                send(tx, StreamMessage::SearchResults { urls }).await
            }

            NormalizedEvent::ToolCompleted { name, output } if is_query_tool(&name) => {
                match extract_db_payload(&output) {
                    Some(payload) => {
                        aggregate.sources.db = Some(payload.clone());
                        send(tx, StreamMessage::QueryDbResults { payload }).await
                    }
                    None => Ok(()),
                }
            }
            NormalizedEvent::ToolCompleted { .. } => Ok(()),
        }
    }

    /// Reports a fatal pre-stream failure as one error event.
    async fn fail(&self, tx: &mpsc::Sender<StreamMessage>, code: ErrorCode) -> StreamOutcome {
        if send(tx, StreamMessage::error(code)).await.is_err() {
            return StreamOutcome::Cancelled;
        }
        StreamOutcome::Failed(code)
    }

    /// Reports a mid-stream failure, classified by its description.
    async fn fail_classified(
        &self,
        tx: &mpsc::Sender<StreamMessage>,
        description: &str,
    ) -> StreamOutcome {
        let message = StreamMessage::classify_error(description);
        let code = match &message {
            StreamMessage::Error { code, .. } => *code,
            _ => ErrorCode::StreamError,
        };
        if send(tx, message).await.is_err() {
            return StreamOutcome::Cancelled;
        }
        StreamOutcome::Failed(code)
    }
}

async fn send(
    tx: &mpsc::Sender<StreamMessage>,
    message: StreamMessage,
) -> Result<(), Disconnected> {
    tx.send(message).await.map_err(|_| Disconnected)
}

fn is_query_tool(name: &str) -> bool {
    name.contains("query") || name.contains("rag")
}

/// Pulls result URLs from a web-search output. Accepts a bare result array
/// or one nested under `results`; entries without a `url` string are skipped.
fn extract_result_urls(output: &Value) -> Vec<String> {
    let entries = output
        .get("results")
        .and_then(Value::as_array)
        .or_else(|| output.as_array());

    entries
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| entry.get("url").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts the structured-query payload from a mapping-shaped tool output.
fn extract_db_payload(output: &Value) -> Option<DbResultPayload> {
    let map = output.as_object()?;
    Some(DbResultPayload {
        rowcount: map.get("rowcount").and_then(Value::as_i64),
        columns: map
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        sample_rows: map
            .get("rows")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    })
}
