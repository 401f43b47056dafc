//! Conversation history supplied by the client.
//!
//! The request body carries UI-style messages (`role` plus a list of typed
//! `parts`). Only text parts matter to the revision loop, so each message is
//! flattened into a plain [`Message`] as soon as it is parsed. `messages` must
//! be present and every entry must have a known role.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RedraftError, Result};
use crate::llm::{Message, Role};

/// One message as sent by the client
#[derive(Debug, Clone, Deserialize)]
pub struct UiMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<UiPart>,
    /// Plain-text shorthand accepted in place of `parts`
    #[serde(default)]
    pub content: Option<String>,
}

/// A typed part of a UI message; anything but text is ignored
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl UiMessage {
    /// Concatenate the text parts (or the `content` shorthand)
    pub fn text(&self) -> String {
        let mut text: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                UiPart::Text { text } => Some(text.as_str()),
                UiPart::Other => None,
            })
            .collect();

        if let Some(content) = &self.content {
            text.push_str(content);
        }
        text
    }
}

impl From<UiMessage> for Message {
    fn from(message: UiMessage) -> Self {
        Message {
            role: message.role,
            content: message.text(),
        }
    }
}

/// Ordered, immutable sequence of role-tagged messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Parse the `messages` field of a request body.
    ///
    /// Fails when the field is missing, is not an array, or holds an entry
    /// that is not a well-formed message.
    pub fn from_request_body(body: &Value) -> Result<Self> {
        let raw = match body.get("messages") {
            None | Some(Value::Null) => {
                return Err(RedraftError::InvalidRequest(
                    "request body is missing `messages`".to_string(),
                ));
            }
            Some(Value::Array(raw)) => raw,
            Some(_) => {
                return Err(RedraftError::InvalidRequest("`messages` must be an array".to_string()));
            }
        };

        let mut messages = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            let message = UiMessage::deserialize(entry)
                .map_err(|e| RedraftError::InvalidRequest(format!("messages[{}] is malformed: {}", index, e)))?;
            messages.push(Message::from(message));
        }

        Ok(Self { messages })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl From<Vec<Message>> for ConversationHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

/// Render the history as `role: text` lines for inclusion in a prompt
pub fn format_history(history: &ConversationHistory) -> String {
    history
        .messages()
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
