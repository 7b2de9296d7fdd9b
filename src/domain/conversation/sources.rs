//! Source citation bundles attached to assistant messages.
//!
//! An assistant turn may cite web search results, database query results, or
//! both. The bundle is persisted as JSON alongside the message and replayed to
//! clients loading history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured citation data for one assistant turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBundle {
    /// Web search citations, keyed under `"web"` on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSources>,
    /// Database query citations, keyed under `"db"` on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<DbResultPayload>,
}

impl SourceBundle {
    /// True if no source of any kind was collected.
    pub fn is_empty(&self) -> bool {
        self.web.is_none() && self.db.is_none()
    }
}

/// Web search citations: the engine that produced them and the result URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSources {
    pub engine: String,
    pub urls: Vec<String>,
}

/// Shape of a structured-query tool result surfaced to the client.
///
/// Also the payload of the `query_db_results` SSE event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbResultPayload {
    pub rowcount: Option<i64>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sample_rows: Vec<Value>,
}
