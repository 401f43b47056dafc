//! Revision loop - drafter and critic take turns improving a reply.

mod events;
mod runner;
mod state;

pub use events::{EventWriter, OutgoingEvent};
pub use runner::{DEFAULT_ROUNDS, RevisionConfig, RevisionOutcome, RevisionRunner};
pub use state::LoopState;
