//! Redraft - draft, critique, revise
//!
//! Redraft answers a conversation by letting a drafter model write a reply and
//! a critic model review it, for a fixed number of rounds. Every partial draft
//! and every piece of feedback is streamed to the client as it is generated;
//! the final draft is delivered last as a single text block.

pub mod error;
pub mod eval;
pub mod guardrail;
pub mod history;
pub mod id;
pub mod llm;
pub mod prompt;
pub mod revision;
pub mod server;

pub use error::{RedraftError, Result};
