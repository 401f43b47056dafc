//! Route handlers.
//!
//! `POST /api/chat` answers with a UI message stream: one SSE `data:` frame
//! per event, closed by `data: [DONE]`. A failed run gets an `error` frame in
//! place of `finish`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;
use crate::guardrail::last_user_text;
use crate::history::ConversationHistory;
use crate::revision::{EventWriter, OutgoingEvent};
use crate::server::state::AppState;

/// Header announcing the UI message stream protocol
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const UI_MESSAGE_STREAM_VERSION: &str = "v1";

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub rounds: u32,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.runner.model().to_string(),
        rounds: state.runner.config().rounds,
    })
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

fn bad_request(message: String) -> Response {
    tracing::warn!(error = %message, "Rejected chat request");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Validate the history, then stream the revision loop back as SSE.
pub async fn chat(State(state): State<Arc<AppState>>, body: std::result::Result<Json<Value>, JsonRejection>) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let history = match ConversationHistory::from_request_body(&body) {
        Ok(history) => history,
        Err(e) => return bad_request(e.to_string()),
    };

    if state.guardrail.is_some() {
        if let Err(e) = last_user_text(&history) {
            return bad_request(e.to_string());
        }
    }

    let (writer, rx) = EventWriter::channel(state.channel_capacity);
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = respond(&state, &history, &writer).await;
        drop(writer);
        if let Err(e) = &result {
            tracing::error!(error = %e, "Chat request failed");
        }
        let usage = state.runner.usage();
        tracing::debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Cumulative usage"
        );
        let _ = done_tx.send(result.err().map(|e| e.to_string()));
    });

    (
        [(UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION)],
        Sse::new(ui_message_stream(rx, done_rx)),
    )
        .into_response()
}

/// Screen the request if a guardrail is set, then run the loop
async fn respond(state: &AppState, history: &ConversationHistory, writer: &EventWriter) -> Result<()> {
    if let Some(guardrail) = &state.guardrail {
        if guardrail.check(history).await?.is_blocked() {
            tracing::info!("Request blocked by guardrail");
            return guardrail.write_refusal(writer).await;
        }
    }

    state.runner.run(history, writer).await?;
    Ok(())
}

fn data_frame(value: &impl Serialize) -> Event {
    match serde_json::to_string(value) {
        Ok(data) => Event::default().data(data),
        Err(e) => error_frame(&format!("failed to encode event: {}", e)),
    }
}

fn error_frame(message: &str) -> Event {
    Event::default().data(json!({ "type": "error", "errorText": message }).to_string())
}

/// Loop events, then an error frame if the run failed, then `[DONE]`
fn ui_message_stream(
    rx: tokio::sync::mpsc::Receiver<OutgoingEvent>,
    done_rx: oneshot::Receiver<Option<String>>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    let events = ReceiverStream::new(rx).map(|event| data_frame(&event));

    let failure = stream::once(async move {
        match done_rx.await {
            Ok(None) => None,
            Ok(Some(message)) => Some(error_frame(&message)),
            Err(_) => Some(error_frame("revision task ended unexpectedly")),
        }
    })
    .filter_map(|frame| async move { frame });

    let done = stream::once(async { Event::default().data("[DONE]") });

    events.chain(failure).chain(done).map(Ok)
}
