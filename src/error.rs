//! Error types for Redraft
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Redraft
#[derive(Debug, Error)]
pub enum RedraftError {
    /// Request body or conversation history rejected before any generation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// LLM transport or stream error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Non-success status returned by the model API
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Model API asked us to back off
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// API key environment variable not set
    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    /// Prompt template failed to render
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Consumer of the event stream went away
    #[error("Output channel closed")]
    ChannelClosed,

    /// Evaluation suite could not be loaded or run
    #[error("Eval error: {0}")]
    Eval(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RedraftError {
    /// Whether this error was caused by the caller's input rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(self, RedraftError::InvalidRequest(_))
    }
}

/// Result type alias for Redraft operations
pub type Result<T> = std::result::Result<T, RedraftError>;
