//! Anthropic API client implementation
//!
//! This module implements the LlmClient trait for the Anthropic (Claude)
//! Messages API, consuming its Server-Sent Events stream fragment by fragment.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use serde_json::{Value, json};

use crate::error::{RedraftError, Result};
use crate::llm::client::{LlmClient, TextStream};
use crate::llm::streaming::{StreamChunk, StreamParser, parse_sse_event};
use crate::llm::types::{CompletionRequest, Usage};

/// Anthropic API base URL
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model to use
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default max tokens
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub base_url: String,
    pub api_key_env: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
            base_url: ANTHROPIC_API_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl AnthropicConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
    usage: Arc<Mutex<Usage>>,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    ///
    /// Reads the API key from the environment variable named in the config
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| RedraftError::MissingApiKey {
            env_var: config.api_key_env.clone(),
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RedraftError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
            usage: Arc::new(Mutex::new(Usage::default())),
        })
    }

    /// Build the streaming request body for the Messages API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_ref().unwrap_or(&self.config.model).clone();
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "stream": true,
            "messages": [
                { "role": "user", "content": request.prompt }
            ]
        });

        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        body
    }

    fn open_stream(&self, body: &Value) -> Result<EventSource> {
        let mut source = self
            .client
            .post(&self.config.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .eventsource()
            .map_err(|e| RedraftError::Llm(format!("Failed to open event stream: {:?}", e)))?;

        // No reconnects: a dropped stream is a failed generation
        source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));
        Ok(source)
    }

    /// Get cumulative token usage
    pub fn total_usage(&self) -> Usage {
        *self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn stream_text(&self, request: CompletionRequest) -> Result<TextStream> {
        let body = self.build_request(&request);
        let source = self.open_stream(&body)?;
        let mut state = SseState::new(source, Arc::clone(&self.usage));

        // Wait for the connection so HTTP status errors surface here
        match state.source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(message))) => state.handle_data(&message.data)?,
            Some(Err(e)) => {
                state.abort();
                return Err(map_event_error(e).await);
            }
            None => return Err(RedraftError::Llm("Event stream closed before opening".to_string())),
        }

        tracing::debug!(model = %body["model"], "anthropic stream opened");
        Ok(TextStream::new(stream::unfold(state, next_sse_fragment).boxed()))
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn usage(&self) -> Usage {
        self.total_usage()
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}

/// Per-call state folded over the event source
struct SseState {
    source: EventSource,
    parser: StreamParser,
    pending: VecDeque<String>,
    usage: Arc<Mutex<Usage>>,
    done: bool,
}

impl SseState {
    fn new(source: EventSource, usage: Arc<Mutex<Usage>>) -> Self {
        Self {
            source,
            parser: StreamParser::new(),
            pending: VecDeque::new(),
            usage,
            done: false,
        }
    }

    fn handle_data(&mut self, data: &str) -> Result<()> {
        let Some(event) = parse_sse_event(data) else {
            return Ok(());
        };

        match self.parser.process_event(event) {
            Some(StreamChunk::Text(text)) => self.pending.push_back(text),
            Some(StreamChunk::Done) => self.finish(),
            Some(StreamChunk::Error(message)) => {
                self.abort();
                return Err(RedraftError::Llm(message));
            }
            None => {}
        }
        Ok(())
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.source.close();

        let usage = self.parser.usage;
        self.usage.lock().unwrap_or_else(PoisonError::into_inner).add(&usage);
        tracing::debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            stop_reason = ?self.parser.stop_reason,
            "anthropic stream finished"
        );
    }

    fn abort(&mut self) {
        self.done = true;
        self.pending.clear();
        self.source.close();
    }
}

async fn next_sse_fragment(mut state: SseState) -> Option<(Result<String>, SseState)> {
    loop {
        if let Some(text) = state.pending.pop_front() {
            return Some((Ok(text), state));
        }
        if state.done {
            return None;
        }

        match state.source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(message))) => {
                if let Err(e) = state.handle_data(&message.data) {
                    return Some((Err(e), state));
                }
            }
            Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                state.abort();
                return Some((
                    Err(RedraftError::Llm("Event stream ended before message_stop".to_string())),
                    state,
                ));
            }
            Some(Err(e)) => {
                state.abort();
                return Some((Err(map_event_error(e).await), state));
            }
        }
    }
}

async fn map_event_error(error: reqwest_eventsource::Error) -> RedraftError {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            if status.as_u16() == 429 {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return RedraftError::RateLimited { retry_after_secs };
            }
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            RedraftError::Api {
                status: status.as_u16(),
                message,
            }
        }
        reqwest_eventsource::Error::Transport(e) => RedraftError::Llm(format!("Request failed: {}", e)),
        other => RedraftError::Llm(format!("Event stream error: {}", other)),
    }
}
