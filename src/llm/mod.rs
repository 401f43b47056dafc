//! LLM Client Layer - model API integration with streaming
//!
//! This module provides:
//! - Request/response types for LLM communication
//! - LlmClient trait and the TextStream it returns
//! - AnthropicClient implementation over Server-Sent Events
//! - MockLlmClient with scripted replies

pub mod anthropic;
pub mod client;
pub mod streaming;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{FragmentStream, LlmClient, MockLlmClient, MockReply, TextStream};
pub use streaming::{StreamChunk, StreamEvent, StreamParser, parse_sse_event};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, Usage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _role = Role::User;
        let _request = CompletionRequest::new("system");
        let _client = MockLlmClient::new(vec![MockReply::text(&["hi"])]);
    }
}
