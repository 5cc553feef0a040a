//! Sub-agent runner
//!
//! A delegated task runs in its own message context. Tool-enabled agents
//! get a bounded tool loop; the title agent answers in a single call.

use crate::agent::conversation::Conversation;
use crate::agent::events::{AgentStatus, StreamEvent};
use crate::agent::loop_state::{AgentLoopState, OrchestratorState};
use crate::agent::parser::{AgentCallDirective, ParsedCommands};
use crate::agent::prompts;
use crate::agent::turn::TurnContext;
use crate::core::Result;
use crate::tools::ChangeSet;

/// Runs one delegation to completion
pub struct SubAgentRunner<'a, 'ctx> {
    ctx: &'a TurnContext<'ctx>,
}

impl<'a, 'ctx> SubAgentRunner<'a, 'ctx> {
    pub fn new(ctx: &'a TurnContext<'ctx>) -> Self {
        Self { ctx }
    }

    /// Build the isolated context for a delegation
    pub fn initial_context(&self, call: &AgentCallDirective) -> Conversation {
        let mut conv = Conversation::with_system_prompt(self.ctx.registry.prompt(call.agent));
        conv.add_system(format!("Task: {}", call.task));
        if let Some(context) = &call.context {
            conv.add_system(format!("Context: {}", context));
        }
        if call.agent.is_tool_enabled() {
            conv.add_system(prompts::TOOL_SPEC);
        }
        conv
    }

    /// Run the delegated task and return the sub-agent's result text.
    ///
    /// When the budget runs out the last response stands as the result.
    pub async fn run(&self, call: &AgentCallDirective, changes: &mut ChangeSet) -> Result<String> {
        let agent = call.agent.as_str();
        let mut conv = self.initial_context(call);

        if !call.agent.is_tool_enabled() {
            tracing::info!(agent, "Running single-shot sub-agent");
            let result = self.ctx.complete(&conv, agent).await?;
            self.finished(call).await;
            return Ok(result);
        }

        let mut state = AgentLoopState::new(self.ctx.settings.max_sub_agent_iterations);

        while state.should_continue() {
            tracing::info!(agent, iteration = state.turn + 1, "Sub-agent turn");
            let response = self.ctx.complete(&conv, agent).await?;
            state.record_response(&response);

            let parsed = ParsedCommands::parse(&response);
            let Some(directive) = parsed.first_tool_call() else {
                state.transition(OrchestratorState::EmittingFinalAnswer);
                break;
            };

            state.transition(OrchestratorState::InvokingToolDirectly);
            let result = self.ctx.run_tool(directive, agent, changes).await?;
            self.ctx
                .record_tool_round(&mut conv, &response, &result, prompts::TOOL_OK_SUB_AGENT);
            state.transition(OrchestratorState::Thinking);
        }

        if state.exhausted() {
            tracing::warn!(
                agent,
                max = state.max_turns,
                "Sub-agent ran out of turns; using last response"
            );
        }

        self.finished(call).await;
        Ok(state.last_response.unwrap_or_default())
    }

    async fn finished(&self, call: &AgentCallDirective) {
        tracing::info!(agent = call.agent.as_str(), "Sub-agent finished");
        self.ctx
            .sink
            .send(StreamEvent::Agent {
                agent: call.agent,
                task: call.task.clone(),
                status: AgentStatus::Success,
            })
            .await;
    }
}
