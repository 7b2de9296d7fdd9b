//! Remote agent engine adapter.
//!
//! Drives a reasoning-agent service over HTTP: one POST starts a run, the
//! response body is an SSE stream of agent events. Dropping the returned
//! stream drops the connection, which aborts the run server-side.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Serialize;

use crate::ports::{AgentEngine, AgentEvent, AgentEventStream, EngineError, EngineMessage};

/// Configuration for the remote engine.
#[derive(Debug, Clone)]
pub struct RemoteEngineConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteEngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct RemoteAgentEngine {
    config: RemoteEngineConfig,
    client: Client,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    thread_id: &'a str,
    messages: &'a [EngineMessage],
}

impl RemoteAgentEngine {
    pub fn new(config: RemoteEngineConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn runs_url(&self) -> String {
        format!("{}/runs/stream", self.config.base_url)
    }
}

#[async_trait]
impl AgentEngine for RemoteAgentEngine {
    async fn run(
        &self,
        thread_key: &str,
        messages: Vec<EngineMessage>,
    ) -> Result<AgentEventStream, EngineError> {
        let response = self
            .client
            .post(self.runs_url())
            .json(&RunRequest {
                thread_id: thread_key,
                messages: &messages,
            })
            .send()
            .await
            .map_err(|e| EngineError::Init(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Init(format!("status {status}: {body}")));
        }

        let events = response
            .bytes_stream()
            .map_err(|e| EngineError::Stream(e.to_string()))
            .scan(SseLineDecoder::default(), |decoder, chunk| {
                let out = match chunk {
                    Ok(bytes) => decoder
                        .feed(&bytes)
                        .into_iter()
                        .filter_map(|line| parse_event_line(&line))
                        .collect(),
                    Err(err) => vec![Err(err)],
                };
                futures::future::ready(Some(out))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(events))
    }
}

/// Reassembles SSE lines from arbitrary transport chunks. A `data:` line may
/// arrive split across chunks, so bytes are buffered until a newline lands.
#[derive(Default)]
struct SseLineDecoder {
    buffer: String,
}

impl SseLineDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Parses one SSE line into an agent event. Non-data lines and the `[DONE]`
/// marker yield nothing; malformed data surfaces as a protocol error.
fn parse_event_line(line: &str) -> Option<Result<AgentEvent, EngineError>> {
    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let data = data.trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<AgentEvent>(data) {
        Ok(event) => Some(Ok(event)),
        Err(err) => Some(Err(EngineError::Protocol(format!(
            "bad event payload: {err}"
        )))),
    }
}
