//! Evaluation harness
//!
//! Runs a YAML-defined suite of inputs through an LLM client and scores
//! each output with deterministic scorers.

mod scorers;
mod suite;

pub use scorers::{ContainsScorer, MarkdownLinkScorer, MaxLengthScorer, Scorer, ScorerSpec};
pub use suite::{CaseResult, EvalCase, EvalReport, EvalSuite, Score, run_suite};
