// Evaluation - Scorers
// Deterministic checks applied to a model's output

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]\([^)]+\)").expect("markdown link pattern is valid"));

/// A deterministic check over one input/output pair
pub trait Scorer: Send + Sync {
    /// Name shown in reports
    fn name(&self) -> &str;

    /// Score in `[0, 1]`
    fn score(&self, input: &str, output: &str) -> f64;
}

fn binary(passed: bool) -> f64 {
    if passed { 1.0 } else { 0.0 }
}

/// Passes when the output contains at least one `[text](url)` link
#[derive(Debug, Clone, Default)]
pub struct MarkdownLinkScorer;

impl Scorer for MarkdownLinkScorer {
    fn name(&self) -> &str {
        "Includes Markdown Links"
    }

    fn score(&self, _input: &str, output: &str) -> f64 {
        binary(MARKDOWN_LINK.is_match(output))
    }
}

/// Passes when the output has at most `max_chars` characters
#[derive(Debug, Clone)]
pub struct MaxLengthScorer {
    pub max_chars: usize,
}

impl Scorer for MaxLengthScorer {
    fn name(&self) -> &str {
        "Output length"
    }

    fn score(&self, _input: &str, output: &str) -> f64 {
        binary(output.chars().count() <= self.max_chars)
    }
}

/// Passes when the output contains `needle`, ignoring case
#[derive(Debug, Clone)]
pub struct ContainsScorer {
    pub needle: String,
    name: String,
}

impl ContainsScorer {
    pub fn new(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let name = format!("Contains '{}'", needle);
        Self { needle, name }
    }
}

impl Scorer for ContainsScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, _input: &str, output: &str) -> f64 {
        binary(output.to_lowercase().contains(&self.needle.to_lowercase()))
    }
}

/// Scorer as written in a suite file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorerSpec {
    MarkdownLinks,
    MaxLength { max_chars: usize },
    Contains { needle: String },
}

impl ScorerSpec {
    pub fn build(&self) -> Box<dyn Scorer> {
        match self {
            ScorerSpec::MarkdownLinks => Box::new(MarkdownLinkScorer),
            ScorerSpec::MaxLength { max_chars } => Box::new(MaxLengthScorer { max_chars: *max_chars }),
            ScorerSpec::Contains { needle } => Box::new(ContainsScorer::new(needle.clone())),
        }
    }
}
