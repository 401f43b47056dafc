//! Guardrail - an LLM classifier that screens a request before revision.
//!
//! The latest user message is sent to the classifier with its own system
//! prompt. A reply of `0` (after trimming) blocks the request; anything else
//! lets it through. A blocked request gets a fixed refusal instead of a loop.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{RedraftError, Result};
use crate::history::ConversationHistory;
use crate::llm::{CompletionRequest, LlmClient, Role};
use crate::revision::{EventWriter, OutgoingEvent};

pub const DEFAULT_GUARDRAIL_SYSTEM: &str = "You are a content safety classifier for a workplace writing assistant.

Decide whether the user's request is appropriate to help with.

Reply with exactly one character:
- 1 if the request is appropriate
- 0 if the request asks for harassment, threats, illegal activity, or anything unsafe

Do not explain your answer.";

pub const DEFAULT_REFUSAL: &str = "I can't answer this question";

/// Classifier decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

impl Verdict {
    /// Interpret a raw classifier reply
    pub fn from_reply(reply: &str) -> Self {
        if reply.trim() == "0" {
            Verdict::Block
        } else {
            Verdict::Allow
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block)
    }
}

/// Text of the last message, which must be a non-empty user message
pub fn last_user_text(history: &ConversationHistory) -> Result<&str> {
    match history.last() {
        Some(message) if message.role == Role::User && !message.content.trim().is_empty() => {
            Ok(message.content.as_str())
        }
        _ => Err(RedraftError::InvalidRequest("missing valid user message".to_string())),
    }
}

/// LLM-backed request screen
pub struct Guardrail {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    refusal: String,
}

impl Guardrail {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: DEFAULT_GUARDRAIL_SYSTEM.to_string(),
            refusal: DEFAULT_REFUSAL.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }

    pub fn refusal(&self) -> &str {
        &self.refusal
    }

    /// Classify the latest user message in `history`
    pub async fn check(&self, history: &ConversationHistory) -> Result<Verdict> {
        let prompt = last_user_text(history)?;
        let request = CompletionRequest::new(&self.system_prompt).with_prompt(prompt);

        let started = Instant::now();
        let response = self.client.complete(request).await?;
        let verdict = Verdict::from_reply(&response.content);

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply = %response.content.trim(),
            blocked = verdict.is_blocked(),
            "Guardrail checked"
        );

        Ok(verdict)
    }

    /// Answer a blocked request: `Start`, the refusal as a text block, `Finish`
    pub async fn write_refusal(&self, writer: &EventWriter) -> Result<()> {
        writer.write(OutgoingEvent::Start).await?;
        writer.write_text_block(&self.refusal).await?;
        writer.write(OutgoingEvent::Finish).await
    }
}

impl std::fmt::Debug for Guardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guardrail")
            .field("model", &self.client.model())
            .field("refusal", &self.refusal)
            .finish()
    }
}
