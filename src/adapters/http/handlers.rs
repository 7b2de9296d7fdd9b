//! HTTP handlers connecting Axum routes to the application layer.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::application::chat::{ErrorCode, StreamMessage, ANONYMOUS_KEY, DEFAULT_GREETING};
use crate::application::insights::ChartContext;
use crate::domain::conversation::NewMessage;

use super::dto::{
    BootMessage, BootResponse, ChatBootParams, ChatStreamParams, ErrorResponse, InsightsRequest,
    MessagesResponse, MessageView, SyncRequest, SyncResponse,
};
use super::state::AppState;

/// Channel capacity for one SSE stream. Token events are small; the pipeline
/// blocks on send once the client stops reading.
const STREAM_BUFFER: usize = 64;

/// GET /chat_stream - the main chat endpoint.
///
/// Runs the chat pipeline in a spawned task and bridges its events into the
/// SSE body. An empty query yields a single INVALID_INPUT error event.
pub async fn chat_stream(
    State(state): State<AppState>,
    Query(params): Query<ChatStreamParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::channel::<StreamMessage>(STREAM_BUFFER);

    tokio::spawn(async move {
        if params.query.trim().is_empty() {
            let _ = tx.send(StreamMessage::error(ErrorCode::InvalidInput)).await;
            return;
        }
        state
            .pipeline
            .run(params.user_id.as_deref(), &params.query, tx)
            .await;
    });

    let stream = ReceiverStream::new(rx).map(|msg| Event::default().json_data(&msg));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /chat_boot - first-contact greeting, or stored history if greeted.
pub async fn chat_boot(
    State(state): State<AppState>,
    Query(params): Query<ChatBootParams>,
) -> Json<BootResponse> {
    if params.skip_greeting {
        return Json(BootResponse { messages: vec![] });
    }

    let session_key = params.user_id.as_deref().unwrap_or(ANONYMOUS_KEY);

    if params.user_id.is_some() {
        match state.store.get(session_key).await {
            Ok(Some(conversation)) if conversation.greeted => {
                let messages = conversation
                    .dialogue()
                    .map(|m| BootMessage {
                        role: m.role.as_str(),
                        content: m.content.clone(),
                    })
                    .collect();
                return Json(BootResponse { messages });
            }
            Ok(_) => {}
            Err(err) => {
                // Boot never fails hard; fall through to a fresh greeting.
                warn!(session_key, error = %err, "history load failed during boot");
            }
        }
    }

    let (system_prompt, result) = state.greeter.greet(params.fname.as_deref()).await;
    let greeting = match result {
        Ok(text) => text,
        Err(degraded) => {
            warn!(session_key, reason = %degraded.reason, "greeting generation degraded");
            DEFAULT_GREETING.to_string()
        }
    };

    if params.user_id.is_some() {
        let messages = [
            NewMessage::system(system_prompt.clone()),
            NewMessage::assistant(greeting.clone()),
        ];
        if let Err(err) = state
            .store
            .upsert_greeting(session_key, params.fname.as_deref(), &messages)
            .await
        {
            warn!(session_key, error = %err, "failed to persist greeting");
        }
    }

    // Fresh boots return both lines, mirroring what gets persisted.
    Json(BootResponse {
        messages: vec![
            BootMessage {
                role: "system",
                content: system_prompt,
            },
            BootMessage {
                role: "assistant",
                content: greeting,
            },
        ],
    })
}

/// POST /sync_anonymous_messages - bulk append of client-side history.
pub async fn sync_anonymous_messages(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ApiError> {
    let messages: Vec<NewMessage> = request
        .messages
        .into_iter()
        .map(|m| m.into_new_message(&request.user_id))
        .filter(|m| !m.is_empty())
        .collect();

    state
        .store
        .append(&request.user_id, &messages)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SyncResponse {
        success: true,
        synced: messages.len(),
    }))
}

/// GET /api/ai/get-chat-messages/:user_id - full stored history.
pub async fn get_chat_messages(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let conversation = state
        .store
        .get(&user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let messages = conversation
        .map(|c| c.messages.iter().map(MessageView::from).collect())
        .unwrap_or_default();

    Ok(Json(MessagesResponse { messages }))
}

/// POST /generate/insights - mode-routed analytics synthesis.
pub async fn generate_insights(
    State(state): State<AppState>,
    Json(request): Json<InsightsRequest>,
) -> Response {
    if request.mode == "investment_score" {
        let report = state
            .insights
            .investment_report(&request.area, &request.metrics)
            .await;
        return Json(report).into_response();
    }

    let chart = ChartContext {
        chart_type: request.chart_type,
        context: request.context,
        data_summary: request.data_summary,
        detail_level: request.detail_level,
    };

    match request.mode.as_str() {
        "snapshot" => Json(state.insights.opportunity_snapshot(&chart).await).into_response(),
        "narrative" => {
            let narrative = state.insights.market_narrative(&chart).await;
            Json(json!({ "aiNarrative": narrative })).into_response()
        }
        // Any other mode falls through to the data-driven insight.
        _ => {
            let insight = state.insights.chart_insight(&chart).await;
            Json(json!({ "insight": insight })).into_response()
        }
    }
}

/// Non-stream endpoint failures. The raw message is logged, not returned.
#[derive(Debug)]
pub enum ApiError {
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Internal(msg) = self;
        warn!(error = %msg, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::agent::ScriptedAgentEngine;
    use crate::adapters::ai::MockProvider;
    use crate::adapters::storage::InMemoryConversationStore;
    use crate::application::chat::{
        ChatPipeline, ContextWindowBuilder, FollowUpSuggester, Greeter, Summarizer,
    };
    use crate::application::insights::InsightsService;
    use crate::domain::conversation::Role;
    use crate::ports::ConversationStore;

    fn state_with(store: Arc<InMemoryConversationStore>, provider: MockProvider) -> AppState {
        let provider = Arc::new(provider);
        let store: Arc<dyn ConversationStore> = store;
        let pipeline = Arc::new(ChatPipeline::new(
            Arc::new(ScriptedAgentEngine::new(vec![])),
            store.clone(),
            ContextWindowBuilder::new(Summarizer::new(provider.clone())),
            FollowUpSuggester::new(provider.clone()),
        ));
        AppState::new(
            pipeline,
            store,
            Arc::new(Greeter::new(provider.clone())),
            Arc::new(InsightsService::new(provider)),
        )
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn fresh_boot_returns_system_prompt_and_greeting() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(store.clone(), MockProvider::returning("Hi Lina!"));

        let response = chat_boot(
            State(state),
            Query(ChatBootParams {
                user_id: Some("u-1".into()),
                fname: Some("Lina".into()),
                skip_greeting: false,
            }),
        )
        .await;

        let messages = response.0.messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Lina"));
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "Hi Lina!");

        // Both lines were persisted for the signed-in user.
        let conv = store.get("u-1").await.unwrap().unwrap();
        assert!(conv.greeted);
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn anonymous_boot_is_not_persisted() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(store.clone(), MockProvider::returning("Hello!"));

        let response = chat_boot(
            State(state),
            Query(ChatBootParams {
                user_id: None,
                fname: None,
                skip_greeting: false,
            }),
        )
        .await;

        assert_eq!(response.0.messages.len(), 2);
        assert!(store.get(ANONYMOUS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sync_preserves_assistant_attachments() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(store.clone(), MockProvider::returning("ok"));

        let request: SyncRequest = serde_json::from_value(serde_json::json!({
            "user_id": "u-9",
            "messages": [
                {"role": "user", "content": "best yields?"},
                {"role": "ai", "content": "JVC leads.", "followups": ["And rents?"],
                 "sources": {"web": {"engine": "tavily", "urls": ["https://a.example"]}}}
            ]
        }))
        .unwrap();

        let response = sync_anonymous_messages(State(state), Json(request))
            .await
            .unwrap();
        assert!(response.0.success);
        assert_eq!(response.0.synced, 2);

        let conv = store.get("u-9").await.unwrap().unwrap();
        assert_eq!(
            conv.messages[1].follow_ups.as_deref(),
            Some(&["And rents?".to_string()][..])
        );
        assert!(conv.messages[1].sources.is_some());
    }

    #[tokio::test]
    async fn insights_snapshot_mode_returns_verdict_shape() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(
            store,
            MockProvider::returning("Verdict: Risky\nReason: A supply wave is landing."),
        );

        let request: InsightsRequest = serde_json::from_value(serde_json::json!({
            "mode": "snapshot",
            "chart_type": "supply_pipeline",
            "context": {"area": "JVC"},
            "data_summary": []
        }))
        .unwrap();

        let value = body_json(generate_insights(State(state), Json(request)).await).await;
        assert_eq!(value["snapshotVerdict"], "Risky");
        assert_eq!(value["snapshotReason"], "A supply wave is landing.");
    }

    #[tokio::test]
    async fn insights_default_mode_is_the_chart_insight() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(store, MockProvider::returning("Prices rose steadily."));

        let request: InsightsRequest =
            serde_json::from_value(serde_json::json!({"chart_type": "price_trend"})).unwrap();

        let value = body_json(generate_insights(State(state), Json(request)).await).await;
        assert_eq!(value["insight"], "Prices rose steadily.");
    }

    #[tokio::test]
    async fn insights_narrative_mode_uses_client_key() {
        let store = Arc::new(InMemoryConversationStore::new());
        let state = state_with(store, MockProvider::returning("A story of steady growth."));

        let request: InsightsRequest =
            serde_json::from_value(serde_json::json!({"mode": "narrative"})).unwrap();

        let value = body_json(generate_insights(State(state), Json(request)).await).await;
        assert_eq!(value["aiNarrative"], "A story of steady growth.");
    }
}
