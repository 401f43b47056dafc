//! Per-request loop state.

/// What one revision run carries from round to round.
///
/// Both texts start empty. `step` counts completed rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    pub step: u32,
    pub most_recent_draft: String,
    pub most_recent_feedback: String,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the draft with the one just produced
    pub fn record_draft(&mut self, draft: String) {
        self.most_recent_draft = draft;
    }

    /// Replace the feedback and close the round
    pub fn complete_round(&mut self, feedback: String) {
        self.most_recent_feedback = feedback;
        self.step += 1;
    }

    /// Whether `rounds` rounds have completed
    pub fn is_done(&self, rounds: u32) -> bool {
        self.step >= rounds
    }
}
