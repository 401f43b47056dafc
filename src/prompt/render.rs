//! Prompt Renderer - Render templates with context variables using Handlebars
//!
//! This module provides the PromptRenderer struct which uses Handlebars to
//! render prompt templates with context variables.

use std::collections::HashMap;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{RedraftError, Result};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing variables render as empty strings
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with the given context
    ///
    /// # Arguments
    /// * `template` - The template string containing {{variable}} placeholders
    /// * `context` - A HashMap of variable names to values
    pub fn render(&self, template: &str, context: &HashMap<String, String>) -> Result<String> {
        self.render_with(template, context)
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| RedraftError::Prompt(format!("Failed to render template: {}", e)))
    }

    /// Register a named template for later use
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| RedraftError::Prompt(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| RedraftError::Prompt(format!("Failed to render template '{}': {}", name, e)))
    }

    /// Check if a named template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple() {
        let renderer = PromptRenderer::new();
        let mut context = HashMap::new();
        context.insert("name".to_string(), "World".to_string());

        assert_eq!(renderer.render("Hello, {{name}}!", &context).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_render_missing_variable_empty_string() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();

        // Non-strict mode
        assert_eq!(renderer.render("Hello, {{name}}!", &context).unwrap(), "Hello, !");
    }

    #[test]
    fn test_render_no_escape_html() {
        let renderer = PromptRenderer::new();
        let mut context = HashMap::new();
        context.insert("draft".to_string(), "<@U123> can you review? & thanks".to_string());

        let result = renderer.render("Draft: {{draft}}", &context).unwrap();
        assert_eq!(result, "Draft: <@U123> can you review? & thanks");
    }

    #[test]
    fn test_render_with_serializable() {
        #[derive(Serialize)]
        struct Context {
            name: String,
            count: i32,
        }

        let renderer = PromptRenderer::new();
        let context = Context {
            name: "Bob".to_string(),
            count: 5,
        };

        let result = renderer.render_with("{{name}} has {{count}} items", &context).unwrap();
        assert_eq!(result, "Bob has 5 items");
    }

    #[test]
    fn test_render_invalid_template() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();
        let result = renderer.render("{{#if}}", &context);
        assert!(matches!(result, Err(RedraftError::Prompt(_))));
    }

    #[test]
    fn test_register_and_render_named() {
        let mut renderer = PromptRenderer::new();
        assert!(!renderer.has_template("greeting"));

        renderer.register_template("greeting", "Hello, {{name}}!").unwrap();
        assert!(renderer.has_template("greeting"));

        let mut context = HashMap::new();
        context.insert("name".to_string(), "World".to_string());
        assert_eq!(renderer.render_named("greeting", &context).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_render_named_not_found() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();
        assert!(renderer.render_named("nonexistent", &context).is_err());
    }

    #[test]
    fn test_render_preserves_whitespace() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();
        let result = renderer.render("Line 1\n\nLine 3\n\n\nLine 6", &context).unwrap();
        assert_eq!(result, "Line 1\n\nLine 3\n\n\nLine 6");
    }
}
