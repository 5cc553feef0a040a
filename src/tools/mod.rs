//! Tools module - the sandboxed file tool
//!
//! Contains path resolution, tool directives and results, the executor,
//! and the per-request change-set.

pub mod change_set;
pub mod diff;
pub mod directive;
pub mod executor;
pub mod result;
pub mod sandbox;

pub use change_set::ChangeSet;
pub use directive::{ActionKind, ToolCallDirective, TOOL_NAME};
pub use executor::ToolExecutor;
pub use result::ToolResult;
pub use sandbox::Sandbox;
