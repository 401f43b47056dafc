//! Prompt System - Template rendering
//!
//! This module provides the Handlebars renderer and the drafter/critic
//! prompts built on top of it.

mod render;
mod templates;

pub use render::PromptRenderer;
pub use templates::{
    DEFAULT_CRITIC_SYSTEM, DEFAULT_CRITIC_TEMPLATE, DEFAULT_DRAFTER_SYSTEM, DEFAULT_DRAFTER_TEMPLATE, PromptSet,
    RevisionPrompts,
};
