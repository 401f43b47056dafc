//! Drafter and critic prompts for the revision loop.

use serde::{Deserialize, Serialize};

use super::render::PromptRenderer;
use crate::error::Result;
use crate::llm::CompletionRequest;

pub const DEFAULT_DRAFTER_SYSTEM: &str = "You are writing a Slack message for a user based on the conversation history. \
Only return the Slack message, no other text.";

pub const DEFAULT_CRITIC_SYSTEM: &str = "You are evaluating the Slack message produced by the user.

Evaluation criteria:
- The Slack message should be written in a way that is easy to understand.
- It should be appropriate for a professional Slack conversation.
";

pub const DEFAULT_DRAFTER_TEMPLATE: &str = "Conversation history:
{{history}}

Previous draft (if any):
{{draft}}

Previous feedback (if any):
{{feedback}}
";

pub const DEFAULT_CRITIC_TEMPLATE: &str = "Conversation history:
{{history}}

Most recent draft:
{{draft}}

Previous feedback (if any):
{{feedback}}
";

const DRAFTER: &str = "drafter";
const CRITIC: &str = "critic";

/// System instructions and prompt templates for both collaborators.
///
/// Templates see three variables: `history`, `draft` and `feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionPrompts {
    pub drafter_system: String,
    pub critic_system: String,
    pub drafter_template: String,
    pub critic_template: String,
}

impl Default for RevisionPrompts {
    fn default() -> Self {
        Self {
            drafter_system: DEFAULT_DRAFTER_SYSTEM.to_string(),
            critic_system: DEFAULT_CRITIC_SYSTEM.to_string(),
            drafter_template: DEFAULT_DRAFTER_TEMPLATE.to_string(),
            critic_template: DEFAULT_CRITIC_TEMPLATE.to_string(),
        }
    }
}

impl RevisionPrompts {
    /// Parse and register both templates
    pub fn compile(&self) -> Result<PromptSet> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(DRAFTER, &self.drafter_template)?;
        renderer.register_template(CRITIC, &self.critic_template)?;

        Ok(PromptSet {
            renderer,
            drafter_system: self.drafter_system.clone(),
            critic_system: self.critic_system.clone(),
        })
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    history: &'a str,
    draft: &'a str,
    feedback: &'a str,
}

/// Compiled prompts, ready to build requests
pub struct PromptSet {
    renderer: PromptRenderer,
    drafter_system: String,
    critic_system: String,
}

impl PromptSet {
    /// Request for the drafter, given the formatted history and the previous round's output
    pub fn drafter_request(&self, history: &str, previous_draft: &str, previous_feedback: &str) -> Result<CompletionRequest> {
        let prompt = self.renderer.render_named(
            DRAFTER,
            &PromptContext {
                history,
                draft: previous_draft,
                feedback: previous_feedback,
            },
        )?;
        Ok(CompletionRequest::new(&self.drafter_system).with_prompt(prompt))
    }

    /// Request for the critic, given the draft just written and the previous feedback
    pub fn critic_request(&self, history: &str, draft: &str, previous_feedback: &str) -> Result<CompletionRequest> {
        let prompt = self.renderer.render_named(
            CRITIC,
            &PromptContext {
                history,
                draft,
                feedback: previous_feedback,
            },
        )?;
        Ok(CompletionRequest::new(&self.critic_system).with_prompt(prompt))
    }
}

impl std::fmt::Debug for PromptSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSet")
            .field("drafter_system", &self.drafter_system)
            .field("critic_system", &self.critic_system)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_compile() {
        assert!(RevisionPrompts::default().compile().is_ok());
    }

    #[test]
    fn test_drafter_request_first_round() {
        let prompts = RevisionPrompts::default().compile().unwrap();
        let request = prompts.drafter_request("user: ship it", "", "").unwrap();

        assert_eq!(request.system, DEFAULT_DRAFTER_SYSTEM);
        assert!(request.prompt.contains("Conversation history:\nuser: ship it"));
        assert!(request.prompt.contains("Previous draft (if any):\n\n"));
    }

    #[test]
    fn test_drafter_request_carries_previous_round() {
        let prompts = RevisionPrompts::default().compile().unwrap();
        let request = prompts
            .drafter_request("user: ship it", "Shipping now", "Too terse")
            .unwrap();

        assert!(request.prompt.contains("Previous draft (if any):\nShipping now"));
        assert!(request.prompt.contains("Previous feedback (if any):\nToo terse"));
    }

    #[test]
    fn test_critic_request() {
        let prompts = RevisionPrompts::default().compile().unwrap();
        let request = prompts.critic_request("user: ship it", "Shipping now", "").unwrap();

        assert_eq!(request.system, DEFAULT_CRITIC_SYSTEM);
        assert!(request.prompt.contains("Most recent draft:\nShipping now"));
    }

    #[test]
    fn test_custom_templates() {
        let prompts = RevisionPrompts {
            drafter_system: "Write haiku.".to_string(),
            drafter_template: "{{history}} | {{draft}} | {{feedback}}".to_string(),
            ..Default::default()
        }
        .compile()
        .unwrap();

        let request = prompts.drafter_request("h", "d", "f").unwrap();
        assert_eq!(request.system, "Write haiku.");
        assert_eq!(request.prompt, "h | d | f");
    }

    #[test]
    fn test_bad_template_fails_compile() {
        let prompts = RevisionPrompts {
            critic_template: "{{#each}}".to_string(),
            ..Default::default()
        };
        assert!(prompts.compile().is_err());
    }

    #[test]
    fn test_prompts_deserialize_partial() {
        let prompts: RevisionPrompts = serde_yaml::from_str("drafter_system: Be kind.\n").unwrap();
        assert_eq!(prompts.drafter_system, "Be kind.");
        assert_eq!(prompts.critic_template, DEFAULT_CRITIC_TEMPLATE);
    }
}
