//! SSE streaming handler for chat-completions responses

use async_stream::try_stream;
use futures::{Stream, StreamExt};

use super::types::{ApiErrorEnvelope, CompletionChunk, Usage};
use crate::error::ChatError;

/// Payload that closes an OpenAI-style event stream
const DONE_MARKER: &str = "[DONE]";

/// Incremental events decoded from the model stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// Text fragment to append to the answer
    TextDelta(String),
    /// A choice finished (`stop`, `length`, ...)
    Finish { reason: String },
    /// Token usage, sent by some providers on the last chunk
    Usage(Usage),
}

impl ModelEvent {
    /// Map one decoded chunk to events, in order
    ///
    /// Role-only and empty deltas yield nothing.
    pub fn from_chunk(chunk: CompletionChunk) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                events.push(ModelEvent::TextDelta(text));
            }
            if let Some(reason) = choice.finish_reason {
                events.push(ModelEvent::Finish { reason });
            }
        }
        if let Some(usage) = chunk.usage {
            events.push(ModelEvent::Usage(usage));
        }
        events
    }

    pub fn text_delta(&self) -> Option<&str> {
        match self {
            ModelEvent::TextDelta(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Line-oriented server-sent-events decoder
///
/// Bytes are buffered until a full line is available, so UTF-8 sequences and
/// events split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the data of every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.process_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(data)
    }
}

/// Parse one event payload
fn parse_payload(data: &str) -> Result<Vec<ModelEvent>, ChatError> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    if value.get("error").is_some() {
        let envelope: ApiErrorEnvelope = serde_json::from_value(value)?;
        return Err(ChatError::Stream(envelope.error.message));
    }
    let chunk: CompletionChunk = serde_json::from_value(value)?;
    Ok(ModelEvent::from_chunk(chunk))
}

/// Turn a streaming HTTP response into model events
///
/// The stream ends at `[DONE]` or when the connection closes, whichever
/// comes first.
pub fn decode_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<ModelEvent, ChatError>> + Send + 'static {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut done = false;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for data in decoder.push(&chunk) {
                if data == DONE_MARKER {
                    done = true;
                    break;
                }
                for event in parse_payload(&data)? {
                    tracing::debug!(?event, "model event");
                    yield event;
                }
            }
            if done {
                break;
            }
        }

        if !done {
            if let Some(data) = decoder.finish() {
                if data != DONE_MARKER {
                    for event in parse_payload(&data)? {
                        yield event;
                    }
                }
            }
        }
    }
}
