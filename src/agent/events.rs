//! Stream events and the per-request event sink
//!
//! Every event for one request travels through a single channel in
//! emission order. The sink enforces the stream's tail: nothing but the
//! terminal `Done` follows an error, and nothing at all follows `Done`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::registry::AgentId;
use crate::core::QuillError;
use crate::tools::ChangeSet;

pub const UNAUTHORIZED_ERROR: &str = "Invalid or expired API key";
pub const UNAUTHORIZED_DETAIL: &str =
    "Check that the API key in Settings is correct, or open Settings at the top of the page to configure it again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Start,
    Success,
    Error,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Start => "start",
            ToolStatus::Success => "success",
            ToolStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Start,
    Success,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Start => "start",
            AgentStatus::Success => "success",
        }
    }
}

/// One frame of the outbound stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TokenDelta {
        content: String,
    },
    Tool {
        tool: String,
        action: String,
        path: String,
        status: ToolStatus,
        message: Option<String>,
        agent: Option<String>,
    },
    Agent {
        agent: AgentId,
        task: String,
        status: AgentStatus,
    },
    ChangeSetFlush(ChangeSet),
    Error {
        error: String,
        detail: String,
    },
    /// Client-side tool requested by plain chat mode
    ToolCall {
        name: String,
        parameters: Value,
    },
    Done,
}

impl StreamEvent {
    pub fn token(content: impl Into<String>) -> Self {
        Self::TokenDelta {
            content: content.into(),
        }
    }

    /// Error event for a failed request.
    ///
    /// Authorization failures get their own user-facing text; anything else
    /// reports `generic` with the error as detail.
    pub fn from_error(err: &QuillError, generic: &str) -> Self {
        if err.is_unauthorized() {
            Self::Error {
                error: UNAUTHORIZED_ERROR.to_string(),
                detail: UNAUTHORIZED_DETAIL.to_string(),
            }
        } else {
            Self::Error {
                error: generic.to_string(),
                detail: err.to_string(),
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Payload of the SSE `data:` line
    pub fn to_sse_data(&self) -> String {
        let value = match self {
            Self::TokenDelta { content } => json!({"choices": [{"delta": {"content": content}}]}),
            Self::Tool {
                tool,
                action,
                path,
                status,
                message,
                agent,
            } => {
                let mut event = json!({
                    "tool": tool,
                    "action": action,
                    "path": path,
                    "status": status.as_str(),
                });
                if let Some(message) = message {
                    event["message"] = json!(message);
                }
                if let Some(agent) = agent {
                    event["agent"] = json!(agent);
                }
                json!({ "toolEvent": event })
            }
            Self::Agent {
                agent,
                task,
                status,
            } => json!({
                "agentEvent": {
                    "agent": agent.as_str(),
                    "agentName": agent.display_name(),
                    "task": task,
                    "status": status.as_str(),
                }
            }),
            Self::ChangeSetFlush(changes) => json!(changes),
            Self::Error { error, detail } => json!({"error": error, "detail": detail}),
            Self::ToolCall { name, parameters } => json!({
                "toolCallEvent": {"name": name, "parameters": parameters}
            }),
            Self::Done => return "[DONE]".to_string(),
        };
        value.to_string()
    }
}

#[derive(Debug, Default)]
struct SinkState {
    errored: AtomicBool,
    finished: AtomicBool,
}

/// Sending half of one request's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    state: Arc<SinkState>,
}

impl EventSink {
    /// Create a sink and the receiver feeding the transport
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                tx,
                state: Arc::new(SinkState::default()),
            },
            rx,
        )
    }

    /// Send an event; returns false if it was suppressed or the client is gone
    pub async fn send(&self, event: StreamEvent) -> bool {
        if self.state.finished.load(Ordering::SeqCst) {
            return false;
        }
        match &event {
            StreamEvent::Done => self.state.finished.store(true, Ordering::SeqCst),
            StreamEvent::Error { .. } => self.state.errored.store(true, Ordering::SeqCst),
            _ if self.state.errored.load(Ordering::SeqCst) => return false,
            _ => {}
        }
        self.tx.send(event).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Trip `cancel` once the receiving side is dropped.
    ///
    /// The watcher holds a sender; abort the handle when the request ends
    /// so the stream can close.
    pub fn cancel_on_close(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tx.closed().await;
            if !cancel.is_cancelled() {
                tracing::info!("Client disconnected, cancelling request");
                cancel.cancel();
            }
        })
    }
}
