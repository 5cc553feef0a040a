//! Multi-agent streaming endpoint

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{client_history, event_channel, resolve_token, sse_response, ClientMessage};
use crate::agent::{AgentRequest, Orchestrator};
use crate::server::{AppError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/stream", post(agent_stream))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStreamRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub messages: Vec<ClientMessage>,
    #[serde(default)]
    pub selected_file: Option<String>,
    #[serde(default)]
    pub editor_content: Option<String>,
}

async fn agent_stream(
    State(state): State<AppState>,
    Json(req): Json<AgentStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let token = resolve_token(&state, req.api_key.as_deref())?;
    let llm = state.providers.connect(&token)?;

    let orchestrator = Orchestrator::new(
        llm,
        state.executor.clone(),
        state.registry.clone(),
        state.config.agent.clone(),
    );
    let request = AgentRequest {
        messages: client_history(req.messages, false),
        selected_file: req.selected_file,
        editor_content: req.editor_content,
    };

    let (sink, rx) = event_channel();
    let cancel = CancellationToken::new();

    tokio::spawn(async move {
        let watcher = sink.cancel_on_close(cancel.clone());
        orchestrator.stream(request, sink, cancel).await;
        watcher.abort();
    });

    Ok(sse_response(rx))
}
