//! Event normalizer: raw agent-engine events → the closed internal event set.
//!
//! The engine's stream is stringly typed (event-type tags, node names, tool
//! names matched by substring). All of that matching lives here, in one
//! classification function, so the aggregator downstream only ever sees
//! [`NormalizedEvent`] variants.
//!
//! Events are forwarded in the exact order received; this module performs no
//! reordering or buffering beyond single-event transformation.

use serde_json::Value;

use super::protocol::Stage;
use crate::ports::AgentEvent;

/// Engine node that produces the user-facing answer.
const ANSWER_NODE: &str = "agent";

/// Semantic event kinds consumed by the streaming aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    /// The run entered a new user-visible phase.
    StageChanged(Stage),
    /// One answer token.
    Token(String),
    /// The answer text is complete (tool activity may still follow).
    TextComplete,
    /// A tool was invoked. Bare-string inputs arrive wrapped as `{query: ..}`.
    ToolInvoked { name: String, input: Value },
    /// A tool finished; `output` has been flattened by [`unwrap_tool_output`].
    ToolCompleted { name: String, output: Value },
}

/// Classifies one raw engine event. Returns `None` for event types the
/// protocol does not surface.
pub fn normalize(event: AgentEvent) -> Vec<NormalizedEvent> {
    let from_answer = event.node.as_deref() == Some(ANSWER_NODE);

    match event.event.as_str() {
        "model_start" if from_answer => vec![NormalizedEvent::StageChanged(Stage::Writing)],

        "model_stream" if from_answer => {
            match event.data.get("chunk").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => {
                    vec![NormalizedEvent::Token(token.to_string())]
                }
                _ => vec![],
            }
        }

        "model_end" if from_answer => vec![NormalizedEvent::TextComplete],

        "tool_start" => {
            let name = event.name.unwrap_or_default();
            let input = wrap_bare_input(event.data.get("input").cloned().unwrap_or(Value::Null));

            let mut out = Vec::with_capacity(2);
            if let Some(stage) = stage_for_tool(&name) {
                out.push(NormalizedEvent::StageChanged(stage));
            }
            out.push(NormalizedEvent::ToolInvoked { name, input });
            out
        }

        "tool_end" => {
            let name = event.name.unwrap_or_default();
            let raw = event.data.get("output").cloned().unwrap_or(event.data);
            vec![NormalizedEvent::ToolCompleted {
                name,
                output: unwrap_tool_output(raw),
            }]
        }

        // Everything else (retriever internals, chain bookkeeping) is dropped.
        _ => vec![],
    }
}

/// Derives the progress stage from a tool name by substring classification.
pub fn stage_for_tool(name: &str) -> Option<Stage> {
    if name.contains("web_search") {
        Some(Stage::Searching)
    } else if name.contains("query") || name.contains("rag") {
        Some(Stage::Reading)
    } else {
        None
    }
}

/// Wraps a bare string tool input as `{"query": input}`.
fn wrap_bare_input(input: Value) -> Value {
    match input {
        Value::String(s) => serde_json::json!({ "query": s }),
        other => other,
    }
}

/// Envelope keys under which tool implementations nest their real result.
const RESULT_ENVELOPE_KEYS: [&str; 4] = ["output", "result", "return_value", "value"];

/// Flattens a raw tool output to a single shape.
///
/// Different tool implementations return results at different nesting depths:
/// some wrap a JSON-encoded text payload, some nest the result under an
/// envelope key, some return a JSON string. Anything else passes through
/// unchanged.
pub fn unwrap_tool_output(output: Value) -> Value {
    // Wrapper carrying a JSON-encoded text payload (tool-message shape).
    if let Some(content) = output.get("content").and_then(Value::as_str) {
        return match serde_json::from_str(content) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(content.to_string()),
        };
    }

    if let Value::Object(ref map) = output {
        for key in RESULT_ENVELOPE_KEYS {
            if let Some(inner) = map.get(key) {
                return parse_if_json_string(inner.clone());
            }
        }
    }

    parse_if_json_string(output)
}

/// Parses a JSON-encoded string one level; anything else passes through.
fn parse_if_json_string(value: Value) -> Value {
    if let Value::String(ref s) = value {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            return parsed;
        }
    }
    value
}
