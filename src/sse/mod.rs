//! Wire protocol between the streaming relay and the chat client: one JSON
//! payload per `data:` line, terminated by a blank line. A stream carries
//! zero or more token events followed by exactly one terminal event.

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token { token: String, timestamp: String },
    Done,
    Error { message: String },
}

impl StreamEvent {
    pub fn token(text: impl Into<String>) -> Self {
        StreamEvent::Token {
            token: text.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Token { .. })
    }
}

#[derive(Serialize, Deserialize, Default)]
struct WireEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<&StreamEvent> for WireEvent {
    fn from(event: &StreamEvent) -> Self {
        match event {
            StreamEvent::Token { token, timestamp } => WireEvent {
                token: Some(token.clone()),
                timestamp: Some(timestamp.clone()),
                ..WireEvent::default()
            },
            StreamEvent::Done => WireEvent {
                done: Some(true),
                ..WireEvent::default()
            },
            StreamEvent::Error { message } => WireEvent {
                error: Some(true),
                message: Some(message.clone()),
                ..WireEvent::default()
            },
        }
    }
}

impl WireEvent {
    fn into_event(self) -> Option<StreamEvent> {
        if self.error == Some(true) {
            return Some(StreamEvent::Error {
                message: self
                    .message
                    .unwrap_or_else(|| "Streaming error occurred".to_string()),
            });
        }
        if self.done == Some(true) {
            return Some(StreamEvent::Done);
        }
        self.token.map(|token| StreamEvent::Token {
            token,
            timestamp: self.timestamp.unwrap_or_default(),
        })
    }
}

/// Serializes one event as an SSE frame (`data: <json>\n\n`).
pub fn encode(event: &StreamEvent) -> String {
    let json = serde_json::to_string(&WireEvent::from(event)).expect("wire event serializes");
    format!("data: {}\n\n", json)
}

/// Serializes the JSON payload of one event, without SSE framing.
pub fn encode_payload(event: &StreamEvent) -> String {
    serde_json::to_string(&WireEvent::from(event)).expect("wire event serializes")
}

/// Incremental decoder for an event stream. Feed it byte chunks exactly as
/// they arrive from the network; a partial trailing line is carried over to
/// the next chunk. Lines that are not `data:` frames, and frames whose JSON
/// does not parse, are skipped without failing the stream.
///
/// One decoder instance per connection; it holds no state beyond the line
/// buffer and can simply be dropped when the read loop stops.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            match String::from_utf8(line_bytes) {
                Ok(line) => {
                    if let Some(event) = parse_line(&line) {
                        events.push(event);
                    }
                }
                Err(e) => warn!("Skipping non-UTF-8 stream line: {}", e),
            }
        }
        events
    }

    /// Flushes a trailing line that was never newline-terminated. Call once
    /// when the byte stream is exhausted.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8(std::mem::take(&mut self.buffer)).ok()?;
        parse_line(&line)
    }
}

fn parse_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str::<WireEvent>(data) {
        Ok(wire) => wire.into_event(),
        Err(e) => {
            warn!("Error parsing streaming data: {}", e);
            None
        }
    }
}
