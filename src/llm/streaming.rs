//! Streaming support for LLM responses.
//!
//! Decodes the `data:` payloads of the Anthropic Messages API event stream
//! into typed events, and folds them into text fragments plus the final
//! stop reason and token usage.

use serde::Deserialize;

use crate::llm::types::Usage;

/// Events received during streaming from the Anthropic API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Start of message
    MessageStart { message: MessageStart },
    /// Start of a content block (text or tool_use)
    ContentBlockStart { index: u32, content_block: ContentBlock },
    /// Delta within a content block
    ContentBlockDelta { index: u32, delta: BlockDelta },
    /// End of a content block
    ContentBlockStop { index: u32 },
    /// Message delta (stop reason, usage)
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<Usage>,
    },
    /// Message complete
    MessageStop,
    /// Ping event (keep-alive)
    Ping,
    /// Error event
    Error { error: ErrorBody },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageStart {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub message: String,
}

/// Chunk types emitted to consumers during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Text content delta
    Text(String),
    /// Stream completed successfully
    Done,
    /// Stream error reported in-band by the API
    Error(String),
}

/// Parse the `data:` payload of one SSE event into a StreamEvent.
///
/// Anthropic API uses Server-Sent Events (SSE) format:
/// ```text
/// event: content_block_delta
/// data: {"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hi"}}
/// ```
/// Unknown or malformed payloads yield `None`.
pub fn parse_sse_event(data: &str) -> Option<StreamEvent> {
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!(error = %e, "ignoring unrecognised stream payload");
            None
        }
    }
}

/// State tracker for parsing streaming responses.
#[derive(Debug, Default)]
pub struct StreamParser {
    /// Message ID from the API
    pub message_id: Option<String>,
    /// Model that served the request
    pub model: Option<String>,
    /// Accumulated text content
    pub text_content: String,
    /// Stop reason from the final message delta
    pub stop_reason: Option<String>,
    /// Token usage reported so far
    pub usage: Usage,
}

impl StreamParser {
    /// Create a new stream parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event, returning the chunk it produces (if any).
    pub fn process_event(&mut self, event: StreamEvent) -> Option<StreamChunk> {
        match event {
            StreamEvent::MessageStart { message } => {
                self.message_id = message.id;
                self.model = message.model;
                if let Some(usage) = message.usage {
                    self.usage.input_tokens = usage.input_tokens;
                    self.usage.output_tokens = usage.output_tokens;
                }
                None
            }
            StreamEvent::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } => {
                self.text_content.push_str(&text);
                Some(StreamChunk::Text(text))
            }
            StreamEvent::MessageDelta { delta, usage } => {
                self.stop_reason = delta.stop_reason;
                if let Some(usage) = usage {
                    // message_delta carries the cumulative output count
                    self.usage.output_tokens = usage.output_tokens;
                }
                None
            }
            StreamEvent::MessageStop => Some(StreamChunk::Done),
            StreamEvent::Error { error } => Some(StreamChunk::Error(format!("{}: {}", error.kind, error.message))),
            StreamEvent::ContentBlockStart { .. }
            | StreamEvent::ContentBlockDelta { .. }
            | StreamEvent::ContentBlockStop { .. }
            | StreamEvent::Ping => None,
        }
    }
}
