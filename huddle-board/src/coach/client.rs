//! Coaching backend client
//!
//! Talks to the external coaching service: POSTs the user's message and
//! consumes the response body as a server-sent event stream of
//! newline-delimited `data: <json>` lines. Parsing is best-effort; a
//! malformed line is skipped rather than aborting the stream.

use std::collections::VecDeque;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Coach client errors
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Coach backend returned status {0}")]
    Status(u16),
}

/// One message on the coaching stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoachMessage {
    /// Incremental transcript text, concatenated in arrival order
    Text { content: String },
    /// Base64 audio bytes for the playback assembler
    Audio { chunk: String },
    /// Terminates the exchange immediately
    Error { error: String },
    /// No further messages follow
    Done,
}

/// Newline splitter with a carry buffer for partial trailing lines
#[derive(Debug, Default)]
struct SseLineBuffer {
    carry: String,
}

impl SseLineBuffer {
    /// Absorb a body chunk and return the complete lines it closed
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.carry.push_str(&String::from_utf8_lossy(bytes));

        let mut lines: Vec<String> = self.carry.split('\n').map(str::to_string).collect();
        // The final piece has no terminating newline yet; keep it for later
        self.carry = lines.pop().unwrap_or_default();
        lines
    }
}

/// Parse one SSE line; anything but well-formed `data: <json>` is skipped
fn parse_data_line(line: &str) -> Option<CoachMessage> {
    let payload = line.strip_prefix("data: ")?;
    match serde_json::from_str(payload) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!("skipping malformed coach event: {}", e);
            None
        }
    }
}

/// An open coaching stream
pub struct CoachStream {
    body: BoxStream<'static, Result<Vec<u8>, CoachError>>,
    lines: SseLineBuffer,
    queued: VecDeque<CoachMessage>,
}

impl CoachStream {
    /// Next parsed message, or `None` once the backend closes the stream
    pub async fn next_message(&mut self) -> Result<Option<CoachMessage>, CoachError> {
        loop {
            if let Some(message) = self.queued.pop_front() {
                return Ok(Some(message));
            }

            match self.body.next().await {
                Some(Ok(bytes)) => {
                    for line in self.lines.push(&bytes) {
                        if let Some(message) = parse_data_line(&line) {
                            self.queued.push_back(message);
                        }
                    }
                }
                Some(Err(e)) => return Err(e),
                // Any unterminated trailing line is dropped, like the
                // browser reader it replaces
                None => return Ok(None),
            }
        }
    }
}

/// HTTP client for the coaching backend
#[derive(Debug, Clone)]
pub struct CoachClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoachClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Start a coaching exchange for a board
    ///
    /// A non-success HTTP status fails the exchange before any stream is
    /// consumed.
    pub async fn chat(&self, message: &str, board_id: Uuid) -> Result<CoachStream, CoachError> {
        let response = self
            .client
            .post(format!("{}/coachchat", self.base_url))
            .json(&json!({ "message": message, "board_id": board_id }))
            .send()
            .await
            .map_err(|e| CoachError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoachError::Status(status.as_u16()));
        }

        let body = response
            .bytes_stream()
            .map(|result| {
                result
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| CoachError::Network(e.to_string()))
            })
            .boxed();

        Ok(CoachStream {
            body,
            lines: SseLineBuffer::default(),
            queued: VecDeque::new(),
        })
    }
}
