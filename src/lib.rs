//! Quill - multi-agent orchestration for a novel-writing editor
//!
//! A main agent plans each turn and delegates to specialist writing agents,
//! which edit the novel through one sandboxed file tool. Progress streams
//! back to the browser as server-sent events.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Chat-completion client and credential resolution
//! - **Tools**: Sandbox, file tool executor, and per-request change-set
//! - **Agent**: Command parsing, orchestration loops, and stream events
//! - **Server**: Axum routes for streaming and file management
//!
//! # Usage
//!
//! ```rust,no_run
//! use quill::{server, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     server::start_server(Config::load()).await
//! }
//! ```

pub mod agent;
pub mod core;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{ChatMode, Orchestrator, StreamEvent};
pub use core::{Config, QuillError, Result};
