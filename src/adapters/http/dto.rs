//! Request/response DTOs for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Message, NewMessage, Role, SourceBundle};
use crate::domain::scoring::ScoreMetrics;

/// Query parameters for `GET /chat_stream`.
#[derive(Debug, Deserialize)]
pub struct ChatStreamParams {
    #[serde(default)]
    pub query: String,
    pub user_id: Option<String>,
}

/// Query parameters for `GET /chat_boot`.
#[derive(Debug, Deserialize)]
pub struct ChatBootParams {
    pub user_id: Option<String>,
    pub fname: Option<String>,
    #[serde(default)]
    pub skip_greeting: bool,
}

/// One stored message as returned to clients.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub role: &'static str,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourceBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_ups: Option<Vec<String>>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            role: message.role.as_str(),
            content: message.content.clone(),
            created_at: message.created_at,
            sources: message.sources.clone(),
            follow_ups: message.follow_ups.clone(),
        }
    }
}

/// Response body for history endpoints.
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

/// Response body for `GET /chat_boot`.
#[derive(Debug, Serialize)]
pub struct BootMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct BootResponse {
    pub messages: Vec<BootMessage>,
}

/// One message in a `POST /sync_anonymous_messages` request. Assistant
/// entries carry their stream attachments; `followups` is the wire spelling
/// clients send.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub sources: Option<SourceBundle>,
    #[serde(default, alias = "followups")]
    pub follow_ups: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<serde_json::Value>,
}

impl IncomingMessage {
    pub fn into_new_message(self, author_id: &str) -> NewMessage {
        let role = Role::parse(&self.role);
        let author = matches!(role, Role::User).then(|| author_id.to_string());
        NewMessage {
            author_id: author,
            sources: self.sources,
            follow_ups: self.follow_ups,
            images: self.images,
            ..NewMessage::new(role, self.content)
        }
    }
}

/// Request body for `POST /sync_anonymous_messages`.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub synced: usize,
}

/// Request body for `POST /generate/insights`. `mode` picks the synthesis:
/// `investment_score` uses `area`/`metrics`, the chart modes (`insight`,
/// `narrative`, `snapshot`) use the chart fields.
#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default)]
    pub metrics: ScoreMetrics,
    #[serde(default)]
    pub chart_type: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub data_summary: serde_json::Value,
    #[serde(default = "default_detail_level")]
    pub detail_level: String,
}

fn default_mode() -> String {
    "insight".to_string()
}

fn default_area() -> String {
    "Dubai".to_string()
}

fn default_detail_level() -> String {
    "short".to_string()
}

/// Generic error body for non-stream endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
