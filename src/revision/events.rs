//! Events pushed to the client while a revision runs.
//!
//! Serialized as UI message stream parts: one JSON object per event, tagged
//! by `type`. Events sharing an `id` are progressive updates of one field.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{RedraftError, Result};
use crate::id::generate_part_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutgoingEvent {
    Start,
    /// Accumulated draft text for one round
    #[serde(rename = "data-draft")]
    DraftDelta {
        id: String,
        #[serde(rename = "data")]
        text: String,
    },
    /// Accumulated critic feedback for one round
    #[serde(rename = "data-feedback")]
    FeedbackDelta {
        id: String,
        #[serde(rename = "data")]
        text: String,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    Finish,
}

impl OutgoingEvent {
    /// A complete text block: start marker, the whole text, end marker
    pub fn text_block(text: impl Into<String>) -> [OutgoingEvent; 3] {
        let id = generate_part_id();
        [
            OutgoingEvent::TextStart { id: id.clone() },
            OutgoingEvent::TextDelta {
                id: id.clone(),
                delta: text.into(),
            },
            OutgoingEvent::TextEnd { id },
        ]
    }

    /// Part identifier, for events that carry one
    pub fn id(&self) -> Option<&str> {
        match self {
            OutgoingEvent::DraftDelta { id, .. }
            | OutgoingEvent::FeedbackDelta { id, .. }
            | OutgoingEvent::TextStart { id }
            | OutgoingEvent::TextDelta { id, .. }
            | OutgoingEvent::TextEnd { id } => Some(id),
            OutgoingEvent::Start | OutgoingEvent::Finish => None,
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, OutgoingEvent::Finish)
    }
}

/// Push side of the output channel.
///
/// Writes wait for channel capacity. Once the receiver is dropped every
/// write fails with [`RedraftError::ChannelClosed`].
#[derive(Debug, Clone)]
pub struct EventWriter {
    tx: mpsc::Sender<OutgoingEvent>,
}

impl EventWriter {
    pub fn new(tx: mpsc::Sender<OutgoingEvent>) -> Self {
        Self { tx }
    }

    /// Create a writer and the receiver that drains it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutgoingEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn write(&self, event: OutgoingEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| RedraftError::ChannelClosed)
    }

    /// Write `text` as a single text block
    pub async fn write_text_block(&self, text: &str) -> Result<()> {
        for event in OutgoingEvent::text_block(text) {
            self.write(event).await?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
