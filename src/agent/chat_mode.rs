//! Plain chat mode
//!
//! A short loop without sub-agents or file access. The model may ask the
//! client to open the writing workspace with a `<tool_call>` tag; any other
//! reply is streamed as-is.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::conversation::Conversation;
use crate::agent::events::{EventSink, StreamEvent};
use crate::agent::prompts;
use crate::agent::turn::type_out;
use crate::core::types::truncate_chars;
use crate::core::{Message, QuillError, Result};
use crate::llm::LLMProvider;

pub const CHAT_STREAM_FAILED: &str = "Chat stream failed";

/// The one client-side tool chat mode recognizes
pub const SWITCH_TO_WRITING: &str = "switch_to_writing_workspace";

const TOOL_CALL_OPEN: &str = "<tool_call>";
const TOOL_CALL_CLOSE: &str = "</tool_call>";

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
}

#[derive(Clone)]
pub struct ChatMode {
    llm: Arc<dyn LLMProvider>,
    max_iterations: usize,
    typing_delay_ms: u64,
}

/// Outcome of inspecting one chat reply
#[derive(Debug, Clone, PartialEq)]
enum ChatReply<'a> {
    Plain(&'a str),
    SwitchWorkspace { before: &'a str, parameters: Value },
    BadToolCall,
}

impl ChatMode {
    pub fn new(llm: Arc<dyn LLMProvider>, max_iterations: usize, typing_delay_ms: u64) -> Self {
        Self {
            llm,
            max_iterations,
            typing_delay_ms,
        }
    }

    /// Stream one chat request, always ending with `Done`
    pub async fn stream(&self, request: ChatRequest, sink: EventSink, cancel: CancellationToken) {
        match self.run(&request, &sink, &cancel).await {
            Ok(()) => {}
            Err(QuillError::Cancelled) => tracing::info!("Chat request cancelled"),
            Err(e) => {
                tracing::error!(error = %e, "Chat stream failed");
                sink.send(StreamEvent::from_error(&e, CHAT_STREAM_FAILED)).await;
            }
        }
        sink.send(StreamEvent::Done).await;
    }

    pub async fn run(
        &self,
        request: &ChatRequest,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut conv = match request.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            Some(prompt) => Conversation::with_system_prompt(prompt),
            None => Conversation::new(),
        };
        // Chat mode forwards client system turns as-is.
        conv.extend_turns(request.messages.iter().cloned());

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return Err(QuillError::Cancelled);
            }
            tracing::info!(iteration, "Chat turn");
            let reply = self.llm.complete(conv.messages()).await?;
            if cancel.is_cancelled() {
                return Err(QuillError::Cancelled);
            }
            tracing::debug!(preview = truncate_chars(&reply, 200), "Chat model replied");

            match classify(&reply) {
                ChatReply::Plain(text) => {
                    return type_out(sink, cancel, text, self.typing_delay_ms).await;
                }
                ChatReply::SwitchWorkspace { before, parameters } => {
                    tracing::info!("Model requested the writing workspace");
                    type_out(sink, cancel, before, self.typing_delay_ms).await?;
                    sink.send(StreamEvent::ToolCall {
                        name: SWITCH_TO_WRITING.to_string(),
                        parameters,
                    })
                    .await;
                    return Ok(());
                }
                ChatReply::BadToolCall => {
                    tracing::warn!(iteration, "Unusable tool call in chat reply; retrying");
                    conv.add_assistant(&reply);
                    conv.add_system(prompts::CHAT_TOOL_RETRY);
                }
            }
        }

        Ok(())
    }
}

fn classify(reply: &str) -> ChatReply<'_> {
    let lower = reply.to_ascii_lowercase();
    let Some(open) = lower.find(TOOL_CALL_OPEN) else {
        return ChatReply::Plain(reply);
    };
    let body_start = open + TOOL_CALL_OPEN.len();
    let Some(close) = lower[body_start..].find(TOOL_CALL_CLOSE) else {
        return ChatReply::Plain(reply);
    };

    let body = reply[body_start..body_start + close].trim();
    match serde_json::from_str::<Value>(body) {
        Ok(payload) if payload.get("name").and_then(Value::as_str) == Some(SWITCH_TO_WRITING) => {
            ChatReply::SwitchWorkspace {
                before: reply[..open].trim(),
                parameters: payload.get("parameters").cloned().unwrap_or(Value::Null),
            }
        }
        Ok(_) => ChatReply::BadToolCall,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed chat tool call");
            ChatReply::BadToolCall
        }
    }
}
