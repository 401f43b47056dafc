//! Eval suites - a set of inputs run through a model and scored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::scorers::{Scorer, ScorerSpec};
use crate::error::{RedraftError, Result};
use crate::llm::{CompletionRequest, LlmClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    pub input: String,
}

/// Suite definition as loaded from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalSuite {
    pub name: String,
    /// System prompt for every case
    #[serde(default)]
    pub system: String,
    pub cases: Vec<EvalCase>,
    pub scorers: Vec<ScorerSpec>,
}

impl EvalSuite {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let suite: EvalSuite = serde_yaml::from_str(content)?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.cases.is_empty() {
            return Err(RedraftError::Eval(format!("suite '{}' has no cases", self.name)));
        }
        if self.scorers.is_empty() {
            return Err(RedraftError::Eval(format!("suite '{}' has no scorers", self.name)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub scorer: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub input: String,
    pub output: String,
    pub scores: Vec<Score>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub suite: String,
    pub cases: Vec<CaseResult>,
    /// Mean score per scorer, in suite order
    pub averages: Vec<Score>,
}

impl EvalReport {
    /// Mean of the per-scorer averages
    pub fn overall(&self) -> f64 {
        if self.averages.is_empty() {
            return 0.0;
        }
        self.averages.iter().map(|s| s.value).sum::<f64>() / self.averages.len() as f64
    }
}

/// Run every case through `client` and score the outputs.
///
/// Cases run sequentially. A client failure aborts the whole run.
pub async fn run_suite(client: &dyn LlmClient, suite: &EvalSuite) -> Result<EvalReport> {
    let scorers: Vec<Box<dyn Scorer>> = suite.scorers.iter().map(ScorerSpec::build).collect();

    let mut cases = Vec::with_capacity(suite.cases.len());
    for (index, case) in suite.cases.iter().enumerate() {
        let request = CompletionRequest::new(&suite.system).with_prompt(&case.input);
        let output = client
            .complete(request)
            .await
            .map_err(|e| RedraftError::Eval(format!("case {} failed: {}", index + 1, e)))?
            .content;

        let scores = scorers
            .iter()
            .map(|scorer| Score {
                scorer: scorer.name().to_string(),
                value: scorer.score(&case.input, &output),
            })
            .collect();

        tracing::debug!(suite = %suite.name, case = index + 1, "Case scored");
        cases.push(CaseResult {
            input: case.input.clone(),
            output,
            scores,
        });
    }

    let averages = scorers
        .iter()
        .enumerate()
        .map(|(i, scorer)| Score {
            scorer: scorer.name().to_string(),
            value: cases.iter().map(|c| c.scores[i].value).sum::<f64>() / cases.len().max(1) as f64,
        })
        .collect();

    Ok(EvalReport {
        suite: suite.name.clone(),
        cases,
        averages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockReply};
    use std::io::Write;

    const SUITE: &str = r#"
name: TS Release Notes
system: You answer questions about TypeScript releases.
cases:
  - input: Tell me about the TypeScript 5.8 release
  - input: Tell me about the TypeScript 5.2 release
scorers:
  - kind: markdown_links
  - kind: max_length
    max_chars: 40
"#;

    #[test]
    fn test_from_yaml() {
        let suite = EvalSuite::from_yaml(SUITE).unwrap();
        assert_eq!(suite.name, "TS Release Notes");
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.scorers.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SUITE.as_bytes()).unwrap();

        let suite = EvalSuite::load(file.path()).unwrap();
        assert_eq!(suite.cases[1].input, "Tell me about the TypeScript 5.2 release");
    }

    #[test]
    fn test_empty_suite_rejected() {
        let err = EvalSuite::from_yaml("name: empty\ncases: []\nscorers:\n  - kind: markdown_links\n").unwrap_err();
        assert!(matches!(err, RedraftError::Eval(_)));

        let err = EvalSuite::from_yaml("name: blind\ncases:\n  - input: hi\nscorers: []\n").unwrap_err();
        assert!(err.to_string().contains("no scorers"));
    }

    #[tokio::test]
    async fn test_run_suite_scores_and_averages() {
        let suite = EvalSuite::from_yaml(SUITE).unwrap();
        let client = MockLlmClient::new(vec![
            MockReply::text(&["See [5.8](https://ts.dev/5-8)"]),
            MockReply::text(&["TypeScript 5.2 added the using keyword for resource cleanup."]),
        ]);

        let report = run_suite(&client, &suite).await.unwrap();

        assert_eq!(report.cases.len(), 2);
        assert_eq!(report.cases[0].scores[0].value, 1.0);
        assert_eq!(report.cases[0].scores[1].value, 1.0);
        assert_eq!(report.cases[1].scores[0].value, 0.0);
        assert_eq!(report.cases[1].scores[1].value, 0.0);

        assert_eq!(report.averages[0].scorer, "Includes Markdown Links");
        assert_eq!(report.averages[0].value, 0.5);
        assert_eq!(report.averages[1].value, 0.5);
        assert_eq!(report.overall(), 0.5);

        let requests = client.requests();
        assert_eq!(requests[0].system, "You answer questions about TypeScript releases.");
        assert_eq!(requests[1].prompt, "Tell me about the TypeScript 5.2 release");
    }

    #[tokio::test]
    async fn test_run_suite_aborts_on_failure() {
        let suite = EvalSuite::from_yaml(SUITE).unwrap();
        let client = MockLlmClient::new(vec![MockReply::text(&["ok"]), MockReply::fail("quota")]);

        let err = run_suite(&client, &suite).await.unwrap_err();
        assert!(err.to_string().contains("case 2"));
    }
}
