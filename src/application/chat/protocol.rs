//! Typed SSE protocol between server and chat clients.
//!
//! Every event is one `data: <json>` line. Payloads are structured serde
//! types passed through `serde_json`, so embedded quotes, backslashes, and
//! newlines are always encoded correctly; there is no hand-rolled escaping
//! anywhere in the stream path.

use serde::Serialize;

use crate::domain::conversation::DbResultPayload;

/// Coarse progress phase surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The model is generating answer text.
    Writing,
    /// A web search tool is running.
    Searching,
    /// A retrieval or structured-query tool is running.
    Reading,
}

/// One server-to-client stream event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Progress phase changed.
    Stage { stage: Stage },
    /// Incremental answer text.
    Content { content: String },
    /// The answer text is complete; identifies the conversation.
    Checkpoint { checkpoint_id: String },
    /// A web search started.
    SearchStart { query: String, engine: String },
    /// Web search finished with these result URLs.
    SearchResults { urls: Vec<String> },
    /// A structured database query finished.
    QueryDbResults { payload: DbResultPayload },
    /// Suggested follow-up questions.
    Followup { items: Vec<String> },
    /// Terminal failure; always the last event when present.
    Error { message: String, code: ErrorCode },
    /// Normal end of stream; always the last event on success.
    End,
}

/// Stream error codes. Serialized SCREAMING_SNAKE to match the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// History load failed before streaming began.
    DatabaseError,
    /// The agent engine failed to start.
    ModelInitError,
    Timeout,
    ConnectionFailed,
    RateLimit,
    ModelError,
    /// Catch-all for mid-stream failures.
    StreamError,
    /// Catch-all for failures outside the stream loop.
    UnexpectedError,
    /// The request itself was malformed (empty query).
    InvalidInput,
}

impl ErrorCode {
    /// Generic user-safe message for this code. Raw failure text never
    /// reaches the client.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "Unable to load conversation history. Please try again.",
            ErrorCode::ModelInitError => "Unable to initialize AI model. Please try again.",
            ErrorCode::Timeout => "The request took too long to complete. Please try again.",
            ErrorCode::ConnectionFailed => {
                "Network error occurred. Please check your connection and try again."
            }
            ErrorCode::RateLimit => "Too many requests. Please wait a moment and try again.",
            ErrorCode::ModelError => "AI model error. Please try again.",
            ErrorCode::StreamError => {
                "Something went wrong while generating the response. Please try again."
            }
            ErrorCode::UnexpectedError => "An unexpected error occurred. Please try again.",
            ErrorCode::InvalidInput => "Please provide a valid message.",
        }
    }
}

impl StreamMessage {
    /// Builds the single error event for a mid-stream failure, classifying
    /// the raw failure description into an error code by keyword heuristic.
    pub fn classify_error(description: &str) -> StreamMessage {
        let lower = description.to_lowercase();
        let code = if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCode::Timeout
        } else if lower.contains("connection") || lower.contains("network") {
            ErrorCode::ConnectionFailed
        } else if lower.contains("rate limit") {
            ErrorCode::RateLimit
        } else if lower.contains("api") || lower.contains("model") {
            ErrorCode::ModelError
        } else {
            ErrorCode::StreamError
        };
        StreamMessage::error(code)
    }

    /// Builds the error event for a known code.
    pub fn error(code: ErrorCode) -> StreamMessage {
        StreamMessage::Error {
            message: code.user_message().to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn as_value(msg: &StreamMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    mod wire_shape {
        use super::*;

        #[test]
        fn stage_event() {
            let value = as_value(&StreamMessage::Stage { stage: Stage::Searching });
            assert_eq!(value["type"], "stage");
            assert_eq!(value["stage"], "searching");
        }

        #[test]
        fn content_event() {
            let value = as_value(&StreamMessage::Content { content: "Hi".into() });
            assert_eq!(value["type"], "content");
            assert_eq!(value["content"], "Hi");
        }

        #[test]
        fn search_start_carries_engine() {
            let value = as_value(&StreamMessage::SearchStart {
                query: "dubai yields".into(),
                engine: "tavily".into(),
            });
            assert_eq!(value["type"], "search_start");
            assert_eq!(value["engine"], "tavily");
        }

        #[test]
        fn end_event_has_no_payload() {
            let json = serde_json::to_string(&StreamMessage::End).unwrap();
            assert_eq!(json, r#"{"type":"end"}"#);
        }

        #[test]
        fn error_code_is_screaming_snake() {
            let value = as_value(&StreamMessage::error(ErrorCode::DatabaseError));
            assert_eq!(value["code"], "DATABASE_ERROR");
        }
    }

    mod escaping {
        use super::*;

        // The reference implementation hand-escaped tokens and double-escaped
        // single quotes. serde_json must handle all of these verbatim.
        #[test]
        fn control_characters_round_trip() {
            let tricky = "line1\nline2 \"quoted\" 'single' back\\slash";
            let json = serde_json::to_string(&StreamMessage::Content {
                content: tricky.into(),
            })
            .unwrap();

            let parsed: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed["content"], tricky);
        }

        #[test]
        fn single_quotes_are_not_escaped() {
            let json = serde_json::to_string(&StreamMessage::Content {
                content: "it's".into(),
            })
            .unwrap();
            assert!(json.contains("it's"));
            assert!(!json.contains("\\'"));
        }
    }

    mod classification {
        use super::*;

        fn code_for(description: &str) -> ErrorCode {
            match StreamMessage::classify_error(description) {
                StreamMessage::Error { code, .. } => code,
                other => panic!("expected error event, got {:?}", other),
            }
        }

        #[test]
        fn keyword_table() {
            assert_eq!(code_for("request timeout after 30s"), ErrorCode::Timeout);
            assert_eq!(code_for("Connection reset by peer"), ErrorCode::ConnectionFailed);
            assert_eq!(code_for("network unreachable"), ErrorCode::ConnectionFailed);
            assert_eq!(code_for("rate limit exceeded"), ErrorCode::RateLimit);
            assert_eq!(code_for("api returned 500"), ErrorCode::ModelError);
            assert_eq!(code_for("model overloaded"), ErrorCode::ModelError);
            assert_eq!(code_for("something odd"), ErrorCode::StreamError);
        }

        #[test]
        fn message_is_generic_not_raw() {
            let raw = "connection refused: secret-internal-host:5432";
            match StreamMessage::classify_error(raw) {
                StreamMessage::Error { message, .. } => {
                    assert!(!message.contains("secret-internal-host"));
                }
                other => panic!("expected error event, got {:?}", other),
            }
        }
    }
}
