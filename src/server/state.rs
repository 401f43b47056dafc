//! Shared application state for the HTTP server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request handlers.
//! Each chat request builds its own output channel and loop state; nothing
//! mutable is shared between requests.

use std::sync::Arc;

use crate::guardrail::Guardrail;
use crate::revision::RevisionRunner;

/// Default capacity of the per-request event channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Drafter/critic loop run for each chat request
    pub runner: Arc<RevisionRunner>,

    /// Request screen, when enabled
    pub guardrail: Option<Arc<Guardrail>>,

    /// Bound on events buffered between the loop and the HTTP response
    pub channel_capacity: usize,
}

impl AppState {
    pub fn new(runner: RevisionRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            guardrail: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_guardrail(mut self, guardrail: Guardrail) -> Self {
        self.guardrail = Some(Arc::new(guardrail));
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}
