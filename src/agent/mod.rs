//! Agent module - orchestration and streaming
//!
//! Contains the command parser, the sub-agent registry and runner, the main
//! orchestrator loop, plain chat mode, and the stream events they emit.

pub mod chat_mode;
pub mod conversation;
pub mod events;
pub mod loop_state;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod registry;
pub mod sub_agent;
pub mod turn;

pub use chat_mode::{ChatMode, ChatRequest};
pub use conversation::Conversation;
pub use events::{EventSink, StreamEvent};
pub use loop_state::{AgentLoopState, OrchestratorState};
pub use orchestrator::{AgentRequest, Orchestrator};
pub use parser::{AgentCallDirective, ParsedCommands};
pub use registry::{AgentId, AgentRegistry, MAIN_AGENT_ATTRIBUTION};
pub use sub_agent::SubAgentRunner;
