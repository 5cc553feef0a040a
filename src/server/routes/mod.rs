//! API routes

use std::convert::Infallible;

use axum::{
    response::sse::{Event, Sse},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use crate::agent::StreamEvent;
use crate::core::{Message, Role};
use crate::server::{AppError, AppState};

mod agent;
mod chat;
mod files;

const SSE_CHANNEL_BUFFER: usize = 256;

/// Build the API router with all endpoints
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/agent", agent::router())
        .nest("/chat", chat::router())
        .merge(files::router())
}

/// A conversation turn as sent by the browser
#[derive(Debug, Default, Deserialize)]
pub struct ClientMessage {
    #[serde(default, alias = "Role")]
    pub role: Option<String>,
    #[serde(default, alias = "Content")]
    pub content: Option<String>,
}

/// Convert client turns, defaulting the role to user and dropping unknown
/// roles and empty content. System turns are kept only if `keep_system`.
pub fn client_history(messages: Vec<ClientMessage>, keep_system: bool) -> Vec<Message> {
    messages
        .into_iter()
        .filter_map(|m| {
            let content = m.content.filter(|c| !c.trim().is_empty())?;
            let role = match m.role.as_deref() {
                None => Role::User,
                Some(name) => match Role::parse(name) {
                    Some(Role::System) if !keep_system => return None,
                    Some(role) => role,
                    None => {
                        tracing::debug!(role = name, "Skipping turn with unknown role");
                        return None;
                    }
                },
            };
            Some(Message::new(role, content))
        })
        .collect()
}

/// Resolve the caller's key before any streaming starts
fn resolve_token(state: &AppState, api_key: Option<&str>) -> Result<String, AppError> {
    api_key
        .and_then(|key| state.credentials.resolve(key))
        .ok_or_else(|| AppError::BadRequest("Missing API key".to_string()))
}

fn event_channel() -> (crate::agent::EventSink, mpsc::Receiver<StreamEvent>) {
    crate::agent::EventSink::channel(SSE_CHANNEL_BUFFER)
}

/// Frame stream events as `data: <json>` SSE events
fn sse_response(
    rx: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream =
        ReceiverStream::new(rx).map(|event| Ok(Event::default().data(event.to_sse_data())));
    Sse::new(stream)
}
