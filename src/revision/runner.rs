//! Revision runner - alternates drafter and critic for a fixed number of rounds.
//!
//! Each round streams a draft, then streams feedback on it. Both collaborators
//! see the whole conversation plus the previous round's output. After the last
//! round the final draft is emitted as a single text block.

use std::sync::Arc;

use crate::error::{RedraftError, Result};
use crate::history::{ConversationHistory, format_history};
use crate::id::{generate_part_id, generate_run_id};
use crate::llm::{CompletionRequest, LlmClient, Usage};
use crate::prompt::PromptSet;
use crate::revision::events::{EventWriter, OutgoingEvent};
use crate::revision::state::LoopState;

/// Rounds per request when not configured
pub const DEFAULT_ROUNDS: u32 = 2;

/// Configuration for the RevisionRunner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionConfig {
    /// Drafter/critic rounds per request; must be at least 1
    pub rounds: u32,
    /// Maximum tokens for each LLM call, when set
    pub max_tokens: Option<u32>,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            max_tokens: None,
        }
    }
}

/// Result of a completed revision run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionOutcome {
    pub run_id: String,
    /// The final draft, as emitted in the text block
    pub text: String,
    /// Critic feedback from the last round
    pub feedback: String,
    pub rounds: u32,
}

#[derive(Debug, Clone, Copy)]
enum Collaborator {
    Drafter,
    Critic,
}

impl Collaborator {
    fn event(self, id: &str, text: &str) -> OutgoingEvent {
        match self {
            Collaborator::Drafter => OutgoingEvent::DraftDelta {
                id: id.to_string(),
                text: text.to_string(),
            },
            Collaborator::Critic => OutgoingEvent::FeedbackDelta {
                id: id.to_string(),
                text: text.to_string(),
            },
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Collaborator::Drafter => "drafter",
            Collaborator::Critic => "critic",
        }
    }
}

/// RevisionRunner drives one draft/critique loop per request.
///
/// Each run:
/// 1. Emits `Start`
/// 2. Streams a draft built from history + previous draft + previous feedback
/// 3. Streams feedback on that draft
/// 4. Repeats 2-3 until `rounds` rounds have completed
/// 5. Emits the final draft as a text block, then `Finish`
///
/// Any failure ends the run without `Finish`.
pub struct RevisionRunner {
    drafter: Arc<dyn LlmClient>,
    critic: Arc<dyn LlmClient>,
    prompts: PromptSet,
    config: RevisionConfig,
}

impl RevisionRunner {
    /// Create a runner where one client plays both roles
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptSet) -> Self {
        Self {
            drafter: Arc::clone(&client),
            critic: client,
            prompts,
            config: RevisionConfig::default(),
        }
    }

    /// Use a separate client for the critic
    pub fn with_critic(mut self, critic: Arc<dyn LlmClient>) -> Self {
        self.critic = critic;
        self
    }

    pub fn with_config(mut self, config: RevisionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RevisionConfig {
        &self.config
    }

    /// Model used by the drafter
    pub fn model(&self) -> &str {
        self.drafter.model()
    }

    /// Combined usage of both collaborators
    pub fn usage(&self) -> Usage {
        let mut usage = self.drafter.usage();
        if !Arc::ptr_eq(&self.drafter, &self.critic) {
            usage.add(&self.critic.usage());
        }
        usage
    }

    /// Run the loop for `history`, pushing every event through `writer`.
    pub async fn run(&self, history: &ConversationHistory, writer: &EventWriter) -> Result<RevisionOutcome> {
        let rounds = self.config.rounds;
        if rounds == 0 {
            return Err(RedraftError::InvalidRequest("rounds must be at least 1".to_string()));
        }

        let run_id = generate_run_id();
        let history_text = format_history(history);
        tracing::info!(run_id = %run_id, messages = history.len(), rounds, "Revision started");

        writer.write(OutgoingEvent::Start).await?;

        let mut state = LoopState::new();
        while !state.is_done(rounds) {
            let request = self.prompts.drafter_request(
                &history_text,
                &state.most_recent_draft,
                &state.most_recent_feedback,
            )?;
            let draft = self
                .stream_part(self.drafter.as_ref(), Collaborator::Drafter, request, writer)
                .await?;
            state.record_draft(draft);

            let request = self.prompts.critic_request(
                &history_text,
                &state.most_recent_draft,
                &state.most_recent_feedback,
            )?;
            let feedback = self
                .stream_part(self.critic.as_ref(), Collaborator::Critic, request, writer)
                .await?;
            state.complete_round(feedback);

            tracing::debug!(
                run_id = %run_id,
                step = state.step,
                draft_len = state.most_recent_draft.len(),
                feedback_len = state.most_recent_feedback.len(),
                "Round complete"
            );
        }

        writer.write_text_block(&state.most_recent_draft).await?;
        writer.write(OutgoingEvent::Finish).await?;

        tracing::info!(run_id = %run_id, rounds = state.step, "Revision finished");

        Ok(RevisionOutcome {
            run_id,
            text: state.most_recent_draft,
            feedback: state.most_recent_feedback,
            rounds: state.step,
        })
    }

    /// Stream one collaborator's reply, emitting the accumulated text after
    /// every fragment under a fresh part id.
    async fn stream_part(
        &self,
        client: &dyn LlmClient,
        role: Collaborator,
        request: CompletionRequest,
        writer: &EventWriter,
    ) -> Result<String> {
        let request = match self.config.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        };

        let id = generate_part_id();
        let mut stream = client.stream_text(request).await?;
        while let Some(fragment) = stream.next_fragment().await {
            if let Err(e) = fragment {
                tracing::warn!(part_id = %id, role = role.as_str(), error = %e, "Stream failed");
                return Err(e);
            }
            writer.write(role.event(&id, stream.text())).await?;
        }

        Ok(stream.text().to_string())
    }
}

impl std::fmt::Debug for RevisionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionRunner")
            .field("drafter", &self.drafter.model())
            .field("critic", &self.critic.model())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, MockLlmClient, MockReply};
    use crate::prompt::RevisionPrompts;
    use tokio::sync::mpsc;

    fn runner(replies: Vec<MockReply>, rounds: u32) -> (RevisionRunner, Arc<MockLlmClient>) {
        let client = Arc::new(MockLlmClient::new(replies));
        let prompts = RevisionPrompts::default().compile().unwrap();
        let runner = RevisionRunner::new(client.clone(), prompts).with_config(RevisionConfig {
            rounds,
            max_tokens: None,
        });
        (runner, client)
    }

    async fn collect(mut rx: mpsc::Receiver<OutgoingEvent>) -> Vec<OutgoingEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn history() -> ConversationHistory {
        ConversationHistory::from(vec![Message::user("Tell the team I'm out Friday")])
    }

    #[tokio::test]
    async fn test_single_round_event_sequence() {
        let (runner, _) = runner(
            vec![MockReply::text(&["Hi", " there"]), MockReply::text(&["Looks", " good"])],
            1,
        );
        let (writer, rx) = EventWriter::channel(32);

        let outcome = runner.run(&history(), &writer).await.unwrap();
        drop(writer);
        let events = collect(rx).await;

        assert_eq!(outcome.text, "Hi there");
        assert_eq!(outcome.feedback, "Looks good");
        assert_eq!(outcome.rounds, 1);

        assert_eq!(events.len(), 9);
        assert_eq!(events[0], OutgoingEvent::Start);

        let draft_id = events[1].id().unwrap().to_string();
        assert_eq!(
            events[1],
            OutgoingEvent::DraftDelta {
                id: draft_id.clone(),
                text: "Hi".to_string()
            }
        );
        assert_eq!(
            events[2],
            OutgoingEvent::DraftDelta {
                id: draft_id.clone(),
                text: "Hi there".to_string()
            }
        );

        let feedback_id = events[3].id().unwrap().to_string();
        assert_ne!(feedback_id, draft_id);
        assert_eq!(
            events[3],
            OutgoingEvent::FeedbackDelta {
                id: feedback_id.clone(),
                text: "Looks".to_string()
            }
        );
        assert_eq!(
            events[4],
            OutgoingEvent::FeedbackDelta {
                id: feedback_id,
                text: "Looks good".to_string()
            }
        );

        assert!(matches!(events[5], OutgoingEvent::TextStart { .. }));
        assert!(matches!(&events[6], OutgoingEvent::TextDelta { delta, .. } if delta == "Hi there"));
        assert!(matches!(events[7], OutgoingEvent::TextEnd { .. }));
        assert!(events[8].is_finish());
    }

    #[tokio::test]
    async fn test_second_round_sees_previous_round() {
        let (runner, client) = runner(
            vec![
                MockReply::text(&["v1"]),
                MockReply::text(&["too long"]),
                MockReply::text(&["v2"]),
                MockReply::text(&["fine"]),
            ],
            2,
        );
        let (writer, rx) = EventWriter::channel(32);

        let outcome = runner.run(&history(), &writer).await.unwrap();
        drop(writer);
        let _ = collect(rx).await;

        assert_eq!(outcome.text, "v2");

        let requests = client.requests();
        assert_eq!(requests.len(), 4);
        // Round 1 drafter sees empty previous state
        assert!(requests[0].prompt.contains("Previous draft (if any):\n\n"));
        // Critic sees the draft it judges
        assert!(requests[1].prompt.contains("Most recent draft:\nv1"));
        // Round 2 drafter sees round 1 output
        assert!(requests[2].prompt.contains("Previous draft (if any):\nv1"));
        assert!(requests[2].prompt.contains("Previous feedback (if any):\ntoo long"));
        assert!(requests[3].prompt.contains("Previous feedback (if any):\ntoo long"));
        assert!(requests.iter().all(|r| r.prompt.contains("user: Tell the team I'm out Friday")));
    }

    #[tokio::test]
    async fn test_drafter_failure_ends_without_finish() {
        let (runner, _) = runner(vec![MockReply::fail("upstream down")], 2);
        let (writer, rx) = EventWriter::channel(32);

        let result = runner.run(&history(), &writer).await;
        drop(writer);
        let events = collect(rx).await;

        assert!(matches!(result, Err(RedraftError::Llm(_))));
        assert_eq!(events, vec![OutgoingEvent::Start]);
    }

    #[tokio::test]
    async fn test_critic_failure_mid_stream() {
        let (runner, _) = runner(
            vec![
                MockReply::text(&["draft"]),
                MockReply::FailAfter {
                    fragments: vec!["Lo".to_string()],
                    message: "connection reset".to_string(),
                },
            ],
            1,
        );
        let (writer, rx) = EventWriter::channel(32);

        assert!(runner.run(&history(), &writer).await.is_err());
        drop(writer);
        let events = collect(rx).await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[2], OutgoingEvent::FeedbackDelta { text, .. } if text == "Lo"));
        assert!(!events.iter().any(OutgoingEvent::is_finish));
    }

    #[tokio::test]
    async fn test_zero_rounds_rejected_before_start() {
        let (runner, client) = runner(vec![], 0);
        let (writer, rx) = EventWriter::channel(4);

        let result = runner.run(&history(), &writer).await;
        drop(writer);

        assert!(matches!(result, Err(RedraftError::InvalidRequest(_))));
        assert!(collect(rx).await.is_empty());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_closed_channel_stops_loop() {
        let (runner, client) = runner(
            vec![MockReply::text(&["a"]), MockReply::text(&["b"])],
            1,
        );
        let (writer, rx) = EventWriter::channel(4);
        drop(rx);

        let result = runner.run(&history(), &writer).await;
        assert!(matches!(result, Err(RedraftError::ChannelClosed)));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_fragments_produce_empty_draft() {
        let (runner, _) = runner(vec![MockReply::text::<&str>(&[]), MockReply::text(&["ok"])], 1);
        let (writer, rx) = EventWriter::channel(32);

        let outcome = runner.run(&history(), &writer).await.unwrap();
        drop(writer);
        let events = collect(rx).await;

        assert_eq!(outcome.text, "");
        assert!(!events.iter().any(|e| matches!(e, OutgoingEvent::DraftDelta { .. })));
        assert!(events.last().unwrap().is_finish());
    }

    #[tokio::test]
    async fn test_separate_critic_client() {
        let drafter = Arc::new(MockLlmClient::new(vec![MockReply::text(&["draft"])]));
        let critic = Arc::new(MockLlmClient::new(vec![MockReply::text(&["note"])]));
        let prompts = RevisionPrompts::default().compile().unwrap();
        let runner = RevisionRunner::new(drafter.clone(), prompts)
            .with_critic(critic.clone())
            .with_config(RevisionConfig {
                rounds: 1,
                max_tokens: Some(256),
            });
        let (writer, rx) = EventWriter::channel(32);

        runner.run(&history(), &writer).await.unwrap();
        drop(writer);
        let _ = collect(rx).await;

        assert_eq!(drafter.requests().len(), 1);
        assert_eq!(critic.requests().len(), 1);
        assert_eq!(critic.requests()[0].max_tokens, Some(256));
    }
}
