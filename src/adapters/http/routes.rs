//! Routing table.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    chat_boot, chat_stream, generate_insights, get_chat_messages, sync_anonymous_messages,
};
use super::state::AppState;

/// Builds the full application router.
///
/// Endpoints:
/// - GET  /chat_stream - SSE chat stream
/// - GET  /chat_boot - greeting / stored history
/// - POST /sync_anonymous_messages - bulk history append
/// - GET  /api/ai/get-chat-messages/:user_id - stored history
/// - POST /generate/insights - mode-routed analytics synthesis
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/chat_stream", get(chat_stream))
        .route("/chat_boot", get(chat_boot))
        .route("/sync_anonymous_messages", post(sync_anonymous_messages))
        .route("/api/ai/get-chat-messages/:user_id", get(get_chat_messages))
        .route("/generate/insights", post(generate_insights))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
