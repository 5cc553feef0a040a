//! Plain chat streaming endpoint

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
use crate::agent::{ChatMode, ChatRequest};
use crate::server::{AppError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/stream", post(chat_stream))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub messages: Vec<ClientMessage>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let token = resolve_token(&state, req.api_key.as_deref())?;
    let llm = state.providers.connect(&token)?;

    let chat = ChatMode::new(
        llm,
        state.config.chat.max_iterations,
        state.config.agent.typing_delay_ms,
    );
    let request = ChatRequest {
        messages: client_history(req.messages, true),
        system_prompt: req.system_prompt,
    };

    let (sink, rx) = event_channel();
    let cancel = CancellationToken::new();

    tokio::spawn(async move {
        let watcher = sink.cancel_on_close(cancel.clone());
        chat.stream(request, sink, cancel).await;
        watcher.abort();
    });

    Ok(sse_response(rx))
}
