//! HTTP server
//!
//! [`Server`] composes the Axum router and runs the listener. Chat responses
//! are streamed; everything else is plain JSON.

pub mod api;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::error::Result;

pub use state::{AppState, DEFAULT_CHANNEL_CAPACITY};

/// Address the server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Build the router with all routes registered.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/chat", post(api::chat))
        .layer(cors)
        .with_state(state)
}

pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub fn addr(&self) -> String {
        self.config.addr()
    }

    /// Bind the listener and serve until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<()> {
        let addr = self.addr();
        let router = router(Arc::clone(&self.state));

        tracing::info!(addr = %addr, model = %self.state.runner.model(), "Starting server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::prompt::RevisionPrompts;
    use crate::revision::RevisionRunner;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let prompts = RevisionPrompts::default().compile().unwrap();
        let runner = RevisionRunner::new(Arc::new(MockLlmClient::new(vec![])), prompts);
        Arc::new(AppState::new(runner))
    }

    #[test]
    fn test_server_config_addr() {
        assert_eq!(ServerConfig::default().addr(), "127.0.0.1:3000");
        let config = ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "mock-model");
        assert_eq!(body["rounds"], 2);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router(state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
