//! Command parser
//!
//! Model output is free text with embedded markers:
//!
//! - `[CALL_AGENT]{json}` delegates to a sub-agent
//! - `[CALL_TOOL]{json}` calls the file tool
//! - `[TO_USER] text` is the reply shown to the user, up to the next call marker
//!
//! Markers are matched case-insensitively. Older prompts used
//! `<agent_call>`, `<tool>` and `<user>` tags instead; those are consulted
//! per kind only when the bracket markers yield nothing for that kind.

use serde_json::Value;

use crate::agent::registry::AgentId;
use crate::tools::ToolCallDirective;

const AGENT_MARKER: &str = "[call_agent]";
const TOOL_MARKER: &str = "[call_tool]";
const USER_MARKER: &str = "[to_user]";

/// One piece of a tokenized response
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    AgentCall(Value),
    ToolCall(Value),
    UserText(String),
}

/// A delegation request from the main agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCallDirective {
    pub agent: AgentId,
    pub task: String,
    pub context: Option<String>,
}

impl AgentCallDirective {
    /// Parse `{agent, task, context?}`, accepting only registered agents
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let name = payload.get("agent").and_then(Value::as_str)?;
        let Some(agent) = AgentId::parse(name) else {
            tracing::warn!(agent = name, "Ignoring call to unknown agent");
            return None;
        };

        let task = match payload.get("task") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let context = match payload.get("context") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | Some(Value::String(_)) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            agent,
            task,
            context,
        })
    }
}

/// Directives and user text extracted from one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCommands {
    pub agent_calls: Vec<AgentCallDirective>,
    pub tool_calls: Vec<ToolCallDirective>,
    pub user_content: Option<String>,
}

impl ParsedCommands {
    pub fn parse(text: &str) -> Self {
        let mut parsed = Self::default();

        for segment in tokenize(text) {
            match segment {
                Segment::AgentCall(payload) => {
                    parsed.agent_calls.extend(AgentCallDirective::from_payload(&payload));
                }
                Segment::ToolCall(payload) => {
                    parsed.tool_calls.extend(ToolCallDirective::from_payload(&payload));
                }
                Segment::UserText(body) => {
                    let body = body.trim();
                    if parsed.user_content.is_none() && !body.is_empty() {
                        parsed.user_content = Some(body.to_string());
                    }
                }
                Segment::Text(_) => {}
            }
        }

        if parsed.agent_calls.is_empty() {
            if let Some(payload) = legacy_json(text, "agent_call") {
                parsed.agent_calls.extend(AgentCallDirective::from_payload(&payload));
            }
        }
        if parsed.tool_calls.is_empty() {
            if let Some(payload) = legacy_json(text, "tool") {
                parsed.tool_calls.extend(ToolCallDirective::from_payload(&payload));
            }
        }
        if parsed.user_content.is_none() {
            parsed.user_content = legacy_span(text, "user")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }

        // A reply without call markers is addressed to the user, unless it
        // carries an explicit but empty reply marker.
        if parsed.user_content.is_none() && !has_call_markers(text) && !has_reply_marker(text) {
            let whole = text.trim();
            if !whole.is_empty() {
                parsed.user_content = Some(whole.to_string());
            }
        }

        parsed
    }

    pub fn first_agent_call(&self) -> Option<&AgentCallDirective> {
        self.agent_calls.first()
    }

    pub fn first_tool_call(&self) -> Option<&ToolCallDirective> {
        self.tool_calls.first()
    }
}

/// Split a response into typed segments in one left-to-right pass
pub fn tokenize(text: &str) -> Vec<Segment> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let mut segments = Vec::new();
    let mut pos = 0;

    while let Some((start, marker)) = next_marker(&lower, pos) {
        if start > pos {
            segments.push(Segment::Text(text[pos..start].to_string()));
        }
        let body_start = start + marker.len();

        if marker == USER_MARKER {
            let end = next_call_marker(&lower, body_start).unwrap_or(text.len());
            segments.push(Segment::UserText(text[body_start..end].to_string()));
            pos = end;
            continue;
        }

        pos = body_start;
        match leading_json(&text[body_start..]) {
            Ok((value, consumed)) => {
                pos += consumed;
                if marker == AGENT_MARKER {
                    segments.push(Segment::AgentCall(value));
                } else {
                    segments.push(Segment::ToolCall(value));
                }
            }
            Err(reason) => {
                tracing::warn!(marker, reason = %reason, "Skipping malformed directive");
            }
        }
    }

    if pos < text.len() {
        segments.push(Segment::Text(text[pos..].to_string()));
    }
    segments
}

/// Earliest marker at or after `from`
fn next_marker(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    [AGENT_MARKER, TOOL_MARKER, USER_MARKER]
        .into_iter()
        .filter_map(|m| lower[from..].find(m).map(|i| (from + i, m)))
        .min_by_key(|(i, _)| *i)
}

fn next_call_marker(lower: &str, from: usize) -> Option<usize> {
    lower[from..].find("[call_").map(|i| from + i)
}

/// Parse one JSON object at the start of `rest`, returning it and the bytes consumed
fn leading_json(rest: &str) -> Result<(Value, usize), String> {
    let body = rest.trim_start();
    let skipped = rest.len() - body.len();
    if !body.starts_with('{') {
        return Err("expected a JSON object".to_string());
    }

    let mut stream = serde_json::Deserializer::from_str(body).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok((value, skipped + stream.byte_offset())),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("empty payload".to_string()),
    }
}

/// Content between the first `<tag>` and its closing tag
fn legacy_span<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let lower = text.to_ascii_lowercase();
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = lower.find(&open)? + open.len();
    let end = start + lower[start..].find(&close)?;
    Some(&text[start..end])
}

fn legacy_json(text: &str, tag: &str) -> Option<Value> {
    let span = legacy_span(text, tag)?;
    match serde_json::from_str(span.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(tag, error = %e, "Skipping malformed legacy directive");
            None
        }
    }
}

/// Whether the text carries a call marker of either dialect
fn has_call_markers(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    [AGENT_MARKER, TOOL_MARKER, "<agent_call>", "<tool>"]
        .iter()
        .any(|m| lower.contains(m))
}

/// A `[TO_USER]` marker or a closed `<user>` tag, even if empty
fn has_reply_marker(text: &str) -> bool {
    text.to_ascii_lowercase().contains(USER_MARKER) || legacy_span(text, "user").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ActionKind;

    #[test]
    fn test_plain_text_is_user_content() {
        let parsed = ParsedCommands::parse("Hi there");
        assert!(parsed.agent_calls.is_empty());
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.user_content.as_deref(), Some("Hi there"));
    }

    #[test]
    fn test_tool_call_bracket() {
        let text = r#"[CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"create_file","path":"x.md","content":"hi"}}"#;
        let parsed = ParsedCommands::parse(text);

        let call = parsed.first_tool_call().unwrap();
        assert_eq!(call.action, Some(ActionKind::CreateFile));
        assert_eq!(call.path, "x.md");
        assert_eq!(call.content.as_deref(), Some("hi"));
        assert_eq!(parsed.user_content, None);
    }

    #[test]
    fn test_legacy_tool_matches_bracket() {
        let args = r#"{"tool":"manage_novel_files","args":{"action":"update","path":"a/b.md","content":"x"}}"#;
        let bracket = ParsedCommands::parse(&format!("Working.\n[CALL_TOOL] {}", args));
        let legacy = ParsedCommands::parse(&format!("Working.\n<tool>\n{}\n</tool>", args));

        assert_eq!(bracket.tool_calls, legacy.tool_calls);
        assert_eq!(bracket.tool_calls.len(), 1);
    }

    #[test]
    fn test_agent_call_with_user_text() {
        let text = r#"Let me ask.
[CALL_AGENT]{"agent":"outline_agent","task":"Draft outline","context":{"chapters":10}}
[TO_USER] Drafting now."#;
        let parsed = ParsedCommands::parse(text);

        let call = parsed.first_agent_call().unwrap();
        assert_eq!(call.agent, AgentId::Outline);
        assert_eq!(call.task, "Draft outline");
        assert_eq!(call.context.as_deref(), Some(r#"{"chapters":10}"#));
        assert_eq!(parsed.user_content.as_deref(), Some("Drafting now."));
    }

    #[test]
    fn test_unknown_agent_is_dropped() {
        let parsed = ParsedCommands::parse(r#"[CALL_AGENT]{"agent":"ghost_agent","task":"x"}"#);
        assert!(parsed.agent_calls.is_empty());
        assert_eq!(parsed.user_content, None);
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let parsed = ParsedCommands::parse(r#"[call_agent]{"agent":"bename_agent","task":"t"}"#);
        assert_eq!(parsed.agent_calls.len(), 1);

        let parsed = ParsedCommands::parse("[To_User]Hello");
        assert_eq!(parsed.user_content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let text = r#"[CALL_TOOL]{"tool": broken [CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"list","path":""}}"#;
        let parsed = ParsedCommands::parse(text);
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].action, Some(ActionKind::List));
    }

    #[test]
    fn test_multiple_bracket_calls_are_all_kept() {
        let text = r#"[CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"list"}}
[CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"read","path":"a.md"}}"#;
        let parsed = ParsedCommands::parse(text);
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.first_tool_call().unwrap().action, Some(ActionKind::List));
    }

    #[test]
    fn test_user_text_stops_at_next_call() {
        let text = r#"[TO_USER] Saving. [CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"list"}}"#;
        let parsed = ParsedCommands::parse(text);
        assert_eq!(parsed.user_content.as_deref(), Some("Saving."));
        assert_eq!(parsed.tool_calls.len(), 1);
    }

    #[test]
    fn test_json_with_brackets_inside_strings() {
        let text = r#"[CALL_TOOL]{"tool":"manage_novel_files","args":{"action":"update","path":"a.md","content":"[TO_USER] not a marker }"}}"#;
        let parsed = ParsedCommands::parse(text);
        assert_eq!(
            parsed.tool_calls[0].content.as_deref(),
            Some("[TO_USER] not a marker }")
        );
        assert_eq!(parsed.user_content, None);
    }

    #[test]
    fn test_legacy_user_and_agent() {
        let text = r#"<agent_call>{"agent":"check_agent","task":"Review 1-3"}</agent_call><user>On it</user>"#;
        let parsed = ParsedCommands::parse(text);
        assert_eq!(parsed.agent_calls[0].agent, AgentId::Check);
        assert_eq!(parsed.user_content.as_deref(), Some("On it"));
    }

    #[test]
    fn test_empty_user_marker_is_not_content() {
        let parsed = ParsedCommands::parse("[TO_USER]   ");
        assert_eq!(parsed.user_content, None);
        let parsed = ParsedCommands::parse("<user> </user>");
        assert_eq!(parsed.user_content, None);
    }

    #[test]
    fn test_unclosed_user_tag_is_plain_reply() {
        let text = "Here is <user> a tag without close";
        let parsed = ParsedCommands::parse(text);
        assert_eq!(parsed.user_content.as_deref(), Some(text));
        assert!(parsed.agent_calls.is_empty());
        assert!(parsed.tool_calls.is_empty());
    }

    #[test]
    fn test_tokenize_segments() {
        let segments = tokenize(r#"a [CALL_AGENT]{"agent":"x"} b"#);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("a ".into()));
        assert!(matches!(segments[1], Segment::AgentCall(_)));
        assert_eq!(segments[2], Segment::Text(" b".into()));
    }
}
