//! Core LLM client trait, the fragment stream it returns, and a scripted mock

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{RedraftError, Result};
use crate::llm::types::{CompletionRequest, CompletionResponse, Usage};

/// Boxed stream of text fragments as produced by a client
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Lazy, finite, non-restartable sequence of text fragments.
///
/// Every fragment pulled through [`TextStream::next_fragment`] is appended to
/// the accumulated text, so the full text is available once the stream is
/// drained. After the underlying stream ends or yields an error, no further
/// fragments are produced.
pub struct TextStream {
    fragments: FragmentStream,
    text: String,
    finished: bool,
}

impl TextStream {
    pub fn new(fragments: FragmentStream) -> Self {
        Self {
            fragments,
            text: String::new(),
            finished: false,
        }
    }

    /// Build a stream that yields the given fragments in order
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<Result<String>> = fragments.into_iter().map(|f| Ok(f.into())).collect();
        Self::new(stream::iter(fragments).boxed())
    }

    /// Pull the next fragment, suspending until it is available
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        if self.finished {
            return None;
        }

        match self.fragments.next().await {
            Some(Ok(fragment)) => {
                self.text.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the remaining fragments and return the full text
    pub async fn into_text(mut self) -> Result<String> {
        while let Some(fragment) = self.next_fragment().await {
            fragment?;
        }
        Ok(self.text)
    }
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("text", &self.text)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Start a streaming completion
    async fn stream_text(&self, request: CompletionRequest) -> Result<TextStream>;

    /// Single completion request (drains the stream)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let content = self.stream_text(request).await?.into_text().await?;
        Ok(CompletionResponse { content })
    }

    /// Model used when a request does not override it
    fn model(&self) -> &str;

    /// Cumulative token usage across all calls made by this client
    fn usage(&self) -> Usage {
        Usage::default()
    }
}

/// One scripted reply for [`MockLlmClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Stream these fragments, then end
    Fragments(Vec<String>),
    /// Fail before any fragment is produced
    Fail(String),
    /// Stream some fragments, then fail mid-stream
    FailAfter { fragments: Vec<String>, message: String },
}

impl MockReply {
    pub fn text<S: AsRef<str>>(fragments: &[S]) -> Self {
        MockReply::Fragments(fragments.iter().map(|f| f.as_ref().to_string()).collect())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }
}

/// LLM client that replays scripted replies in order and records every request
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    model: String,
}

impl MockLlmClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Every request received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of scripted replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn stream_text(&self, request: CompletionRequest) -> Result<TextStream> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| RedraftError::Llm("mock client has no scripted replies left".to_string()))?;

        match reply {
            MockReply::Fragments(fragments) => Ok(TextStream::from_fragments(fragments)),
            MockReply::Fail(message) => Err(RedraftError::Llm(message)),
            MockReply::FailAfter { fragments, message } => {
                let items: Vec<Result<String>> = fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(RedraftError::Llm(message))))
                    .collect();
                Ok(TextStream::new(stream::iter(items).boxed()))
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
