//! Agent orchestrator
//!
//! Main agent loop: call the model, classify its reply, then delegate to a
//! sub-agent, run a tool, or stream the final answer. All file changes of
//! the request accumulate in one change-set flushed before `Done`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agent::conversation::Conversation;
use crate::agent::events::{AgentStatus, EventSink, StreamEvent};
use crate::agent::loop_state::{AgentLoopState, OrchestratorState};
use crate::agent::parser::ParsedCommands;
use crate::agent::prompts;
use crate::agent::registry::{AgentRegistry, MAIN_AGENT_ATTRIBUTION};
use crate::agent::sub_agent::SubAgentRunner;
use crate::agent::turn::TurnContext;
use crate::core::config::AgentConfig;
use crate::core::types::truncate_chars;
use crate::core::{Message, QuillError, Result};
use crate::llm::LLMProvider;
use crate::tools::{ChangeSet, ToolExecutor};

pub const AGENT_STREAM_FAILED: &str = "Agent stream failed";

/// One streaming request from the editor
#[derive(Debug, Clone, Default)]
pub struct AgentRequest {
    /// Prior conversation turns, oldest first
    pub messages: Vec<Message>,
    /// Path of the file open in the editor
    pub selected_file: Option<String>,
    /// Unsaved editor buffer
    pub editor_content: Option<String>,
}

/// Main agent that coordinates the model, sub-agents and the file tool
#[derive(Clone)]
pub struct Orchestrator {
    llm: Arc<dyn LLMProvider>,
    executor: ToolExecutor,
    registry: Arc<AgentRegistry>,
    settings: AgentConfig,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        executor: ToolExecutor,
        registry: Arc<AgentRegistry>,
        settings: AgentConfig,
    ) -> Self {
        Self {
            llm,
            executor,
            registry,
            settings,
        }
    }

    /// Main context: prompt, optional editor context, then client history
    pub fn initial_context(&self, request: &AgentRequest) -> Conversation {
        let mut conv = Conversation::with_system_prompt(self.registry.main_prompt());
        if let Some(editor) = self.editor_context(request) {
            conv.add_system(editor);
        }
        conv.extend_history(request.messages.iter().cloned());
        conv
    }

    fn editor_context(&self, request: &AgentRequest) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(file) = request.selected_file.as_deref().filter(|f| !f.is_empty()) {
            parts.push(format!("Currently open file: {}", file));
        }
        if let Some(content) = request.editor_content.as_deref().filter(|c| !c.is_empty()) {
            let max = self.settings.editor_context_max_chars;
            let shown = truncate_chars(content, max);
            if shown.len() < content.len() {
                parts.push(format!("Unsaved editor content:\n{}\n...[truncated]", shown));
            } else {
                parts.push(format!("Unsaved editor content:\n{}", content));
            }
        }
        (!parts.is_empty()).then(|| parts.join("\n"))
    }

    /// Run the full streaming protocol for one request.
    ///
    /// Always ends with exactly one `Done`. A successful run flushes the
    /// change-set first; a failed run emits one error event instead.
    pub async fn stream(&self, request: AgentRequest, sink: EventSink, cancel: CancellationToken) {
        let mut changes = ChangeSet::new();

        match self.run(&request, &mut changes, &sink, &cancel).await {
            Ok(()) => {
                if !changes.is_empty() {
                    tracing::info!(files = changes.changed_files().len(), "Flushing change-set");
                    sink.send(StreamEvent::ChangeSetFlush(changes)).await;
                }
            }
            Err(QuillError::Cancelled) => {
                tracing::info!("Agent request cancelled");
            }
            Err(e) => {
                tracing::error!(error = %e, "Agent stream failed");
                sink.send(StreamEvent::from_error(&e, AGENT_STREAM_FAILED)).await;
            }
        }

        sink.send(StreamEvent::Done).await;
    }

    /// Drive the main loop, recording file changes into `changes`
    pub async fn run(
        &self,
        request: &AgentRequest,
        changes: &mut ChangeSet,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let ctx = TurnContext {
            llm: self.llm.as_ref(),
            executor: &self.executor,
            registry: &self.registry,
            settings: &self.settings,
            sink,
            cancel,
        };
        let mut conv = self.initial_context(request);
        let mut state = AgentLoopState::new(self.settings.max_iterations);

        if let Some(last) = conv.last_user_message() {
            tracing::info!(request = truncate_chars(&last.content, 100), "Main agent started");
        }

        while state.should_continue() {
            tracing::info!(iteration = state.turn + 1, max = state.max_turns, "Main agent turn");
            let response = ctx.complete(&conv, MAIN_AGENT_ATTRIBUTION).await?;
            state.record_response(&response);
            let parsed = ParsedCommands::parse(&response);

            if let Some(call) = parsed.first_agent_call() {
                state.transition(OrchestratorState::DelegatingToSubAgent);
                tracing::info!(agent = call.agent.as_str(), "Delegating to sub-agent");
                sink.send(StreamEvent::Agent {
                    agent: call.agent,
                    task: call.task.clone(),
                    status: AgentStatus::Start,
                })
                .await;

                let result = SubAgentRunner::new(&ctx).run(call, changes).await?;
                conv.add_assistant(&response);
                conv.add_system(prompts::sub_agent_finished(call.agent, &result));
                state.transition(OrchestratorState::Thinking);
                continue;
            }

            if let Some(directive) = parsed.first_tool_call() {
                state.transition(OrchestratorState::InvokingToolDirectly);
                let result = ctx
                    .run_tool(directive, MAIN_AGENT_ATTRIBUTION, changes)
                    .await?;
                ctx.record_tool_round(&mut conv, &response, &result, prompts::TOOL_OK_MAIN_AGENT);
                state.transition(OrchestratorState::Thinking);
                continue;
            }

            match parsed.user_content {
                Some(answer) => {
                    state.transition(OrchestratorState::EmittingFinalAnswer);
                    tracing::info!(chars = answer.chars().count(), "Replying to user");
                    ctx.type_out(&answer).await?;
                }
                None => {
                    tracing::debug!("No directive or reply; asking the model to continue");
                    conv.add_assistant(&response);
                    conv.add_system(prompts::CONTINUE_THINKING);
                }
            }
        }

        if state.exhausted() {
            tracing::warn!(max = state.max_turns, "Main agent ran out of turns");
        }
        state.transition(OrchestratorState::Done);
        Ok(())
    }
}
