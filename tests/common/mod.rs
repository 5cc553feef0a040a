//! Shared harness for integration tests
//!
//! A scripted provider replays canned replies in order and records every
//! message list it was sent.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quill::agent::{AgentRegistry, EventSink, Orchestrator, StreamEvent};
use quill::core::config::AgentConfig;
use quill::core::{Message, Result};
use quill::llm::{LLMProvider, ProviderFactory};
use quill::tools::{Sandbox, ToolExecutor};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const TOOL: &str = "manage_novel_files";

/// Replays scripted replies; falls back to `fallback` once the script runs out
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    seen: Mutex<Vec<Vec<Message>>>,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: String::new(),
            seen: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Trip `cancel` while the first call is in flight
    pub fn cancelling(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_call = Some(cancel);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Messages sent on the `index`-th call
    pub fn request(&self, index: usize) -> Vec<Message> {
        self.seen.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        if let Some(cancel) = &self.cancel_on_call {
            cancel.cancel();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Hands out one shared scripted provider and remembers the tokens used
pub struct ScriptedFactory {
    pub provider: Arc<ScriptedProvider>,
    pub tokens: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            tokens: Mutex::new(Vec::new()),
        }
    }
}

impl ProviderFactory for ScriptedFactory {
    fn connect(&self, token: &str) -> Result<Arc<dyn LLMProvider>> {
        self.tokens.lock().unwrap().push(token.to_string());
        let provider: Arc<dyn LLMProvider> = self.provider.clone();
        Ok(provider)
    }
}

pub fn test_settings() -> AgentConfig {
    AgentConfig {
        typing_delay_ms: 0,
        ..AgentConfig::default()
    }
}

/// Orchestrator over a fresh sandbox at `<dir>/data`
pub fn orchestrator(dir: &TempDir, provider: Arc<ScriptedProvider>) -> Orchestrator {
    let sandbox = Sandbox::open(dir.path().join("data")).unwrap();
    Orchestrator::new(
        provider,
        ToolExecutor::new(sandbox),
        Arc::new(AgentRegistry::builtin()),
        test_settings(),
    )
}

pub fn tool_call(args: serde_json::Value) -> String {
    format!(
        "[CALL_TOOL]{}",
        serde_json::json!({ "tool": TOOL, "args": args })
    )
}

pub fn event_channel() -> (EventSink, mpsc::Receiver<StreamEvent>) {
    EventSink::channel(4096)
}

/// Drain every event once the sender side is gone
pub async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Concatenated token deltas
pub fn typed_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TokenDelta { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

pub fn tool_events(events: &[StreamEvent]) -> Vec<&StreamEvent> {
    events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Tool { .. }))
        .collect()
}
