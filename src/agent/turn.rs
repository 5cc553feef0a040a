//! Turn helpers shared by the main loop and sub-agent loops
//!
//! Every suspension point checks the request's cancellation token. A model
//! call already in flight is awaited, but its reply is discarded if the
//! client left meanwhile.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::agent::conversation::Conversation;
use crate::agent::events::{EventSink, StreamEvent, ToolStatus};
use crate::agent::prompts;
use crate::agent::registry::AgentRegistry;
use crate::core::config::AgentConfig;
use crate::core::types::truncate_chars;
use crate::core::{QuillError, Result};
use crate::llm::LLMProvider;
use crate::tools::{ChangeSet, ToolCallDirective, ToolExecutor, ToolResult, TOOL_NAME};

/// Everything one request's loops need
pub struct TurnContext<'a> {
    pub llm: &'a dyn LLMProvider,
    pub executor: &'a ToolExecutor,
    pub registry: &'a AgentRegistry,
    pub settings: &'a AgentConfig,
    pub sink: &'a EventSink,
    pub cancel: &'a CancellationToken,
}

impl TurnContext<'_> {
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(QuillError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// One model call on behalf of `agent`
    pub async fn complete(&self, conversation: &Conversation, agent: &str) -> Result<String> {
        self.ensure_active()?;
        let reply = self.llm.complete(conversation.messages()).await?;
        self.ensure_active()?;

        tracing::debug!(
            agent,
            chars = reply.chars().count(),
            preview = truncate_chars(&reply, 200),
            "Model replied"
        );
        Ok(reply)
    }

    /// Execute a tool call wrapped in start and completion events
    pub async fn run_tool(
        &self,
        directive: &ToolCallDirective,
        attribution: &str,
        changes: &mut ChangeSet,
    ) -> Result<ToolResult> {
        self.ensure_active()?;
        tracing::info!(
            agent = attribution,
            action = directive.action_name(),
            path = %directive.path,
            "Calling tool"
        );

        self.sink
            .send(tool_event(directive, attribution, ToolStatus::Start, None))
            .await;

        let result = self.executor.execute(directive, changes).await;

        let status = if result.ok {
            ToolStatus::Success
        } else {
            ToolStatus::Error
        };
        self.sink
            .send(tool_event(directive, attribution, status, result.message.clone()))
            .await;

        Ok(result)
    }

    /// Feed a tool round back into an agent's context
    pub fn record_tool_round(
        &self,
        conversation: &mut Conversation,
        response: &str,
        result: &ToolResult,
        ok_steering: &str,
    ) {
        conversation.add_assistant(response);
        conversation.add_user(prompts::tool_result_turn(
            &result.compact_for_context(self.settings.compact_threshold),
        ));
        conversation.add_system(if result.ok {
            ok_steering
        } else {
            prompts::TOOL_FAILED
        });
    }

    /// Stream text to the client one character at a time
    pub async fn type_out(&self, text: &str) -> Result<()> {
        type_out(self.sink, self.cancel, text, self.settings.typing_delay_ms).await
    }
}

/// Simulated typing shared with plain chat mode
pub async fn type_out(
    sink: &EventSink,
    cancel: &CancellationToken,
    text: &str,
    delay_ms: u64,
) -> Result<()> {
    let delay = Duration::from_millis(delay_ms);
    for ch in text.chars() {
        if cancel.is_cancelled() {
            return Err(QuillError::Cancelled);
        }
        sink.send(StreamEvent::token(ch)).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}

fn tool_event(
    directive: &ToolCallDirective,
    attribution: &str,
    status: ToolStatus,
    message: Option<String>,
) -> StreamEvent {
    StreamEvent::Tool {
        tool: TOOL_NAME.to_string(),
        action: directive.action_name().to_string(),
        path: directive.path.clone(),
        status,
        message,
        agent: Some(attribution.to_string()),
    }
}
