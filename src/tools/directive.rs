//! Tool call directives
//!
//! The arguments a model sends to `manage_novel_files`.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Name of the single file-management tool exposed to models
pub const TOOL_NAME: &str = "manage_novel_files";

/// File operation requested by a tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    List,
    Read,
    ReadLine,
    EditLine,
    CreateDir,
    CreateFile,
    Update,
    Rename,
    Delete,
    /// Anything the executor does not know; fails as unsupported
    Other(String),
}

impl ActionKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "list" => Self::List,
            "read" => Self::Read,
            "read_line" => Self::ReadLine,
            "edit_line" => Self::EditLine,
            "create_dir" => Self::CreateDir,
            "create_file" => Self::CreateFile,
            "update" => Self::Update,
            "rename" => Self::Rename,
            "delete" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::List => "list",
            Self::Read => "read",
            Self::ReadLine => "read_line",
            Self::EditLine => "edit_line",
            Self::CreateDir => "create_dir",
            Self::CreateFile => "create_file",
            Self::Update => "update",
            Self::Rename => "rename",
            Self::Delete => "delete",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Arguments of one `manage_novel_files` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ToolCallDirective {
    #[serde(default)]
    pub action: Option<ActionKind>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default, deserialize_with = "flexible_line_number")]
    pub line_number: Option<i64>,
    #[serde(default)]
    pub line_content: Option<String>,
}

impl ToolCallDirective {
    pub fn new(action: ActionKind, path: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Action name for events; empty when missing
    pub fn action_name(&self) -> &str {
        self.action.as_ref().map(ActionKind::as_str).unwrap_or("")
    }

    /// Parse a `{tool, args}` payload, accepting only the file tool
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if payload.get("tool").and_then(Value::as_str) != Some(TOOL_NAME) {
            return None;
        }
        let args = payload.get("args")?;
        if !args.is_object() {
            return None;
        }
        match serde_json::from_value(args.clone()) {
            Ok(directive) => Some(directive),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring tool call with invalid args");
                None
            }
        }
    }
}

/// Accept a line number as a JSON number or a numeric string
fn flexible_line_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
