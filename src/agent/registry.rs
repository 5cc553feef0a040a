//! Sub-agent registry
//!
//! The closed set of sub-agents and the system prompts they run with.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::agent::prompts;
use crate::core::Result;

/// Attribution used for tool events raised by the main agent
pub const MAIN_AGENT_ATTRIBUTION: &str = "main_agent";

/// Registered sub-agent identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentId {
    Initiation,
    Bename,
    Worldview,
    Persona,
    Outline,
    Deoutline,
    Introduction,
    Check,
    Novel,
    NovelLuxun,
}

impl AgentId {
    pub const ALL: [AgentId; 10] = [
        AgentId::Initiation,
        AgentId::Bename,
        AgentId::Worldview,
        AgentId::Persona,
        AgentId::Outline,
        AgentId::Deoutline,
        AgentId::Introduction,
        AgentId::Check,
        AgentId::Novel,
        AgentId::NovelLuxun,
    ];

    /// Look up an identifier such as `outline_agent`
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Initiation => "initiation_agent",
            AgentId::Bename => "bename_agent",
            AgentId::Worldview => "worldview_agent",
            AgentId::Persona => "persona_agent",
            AgentId::Outline => "outline_agent",
            AgentId::Deoutline => "deoutline_agent",
            AgentId::Introduction => "introduction_agent",
            AgentId::Check => "check_agent",
            AgentId::Novel => "novel_agent",
            AgentId::NovelLuxun => "novel_agent_luxun",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentId::Initiation => "Initiation Agent",
            AgentId::Bename => "Bename Agent",
            AgentId::Worldview => "Worldview Agent",
            AgentId::Persona => "Persona Agent",
            AgentId::Outline => "Outline Agent",
            AgentId::Deoutline => "Deoutline Agent",
            AgentId::Introduction => "Introduction Agent",
            AgentId::Check => "Check Agent",
            AgentId::Novel => "Novel Agent",
            AgentId::NovelLuxun => "Novel Agent luxun",
        }
    }

    /// Title generation answers in one call without file access
    pub fn is_tool_enabled(&self) -> bool {
        !matches!(self, AgentId::Bename)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompts for the main agent and every sub-agent
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    main_prompt: String,
    prompts: HashMap<AgentId, String>,
}

impl AgentRegistry {
    /// Registry with the built-in prompts
    pub fn builtin() -> Self {
        Self {
            main_prompt: prompts::render_main_prompt(prompts::MAIN_AGENT_PROMPT),
            prompts: AgentId::ALL
                .into_iter()
                .map(|id| (id, prompts::default_agent_prompt(id).to_string()))
                .collect(),
        }
    }

    /// Load prompts, letting `<dir>/<agent_id>.md` override the built-ins.
    ///
    /// `main_agent.md` overrides the main prompt; `{agents}` in it is
    /// replaced with the team roster.
    pub fn load(prompts_dir: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        let Some(dir) = prompts_dir else {
            return Ok(registry);
        };

        if let Some(text) = read_override(dir, MAIN_AGENT_ATTRIBUTION)? {
            registry.main_prompt = prompts::render_main_prompt(&text);
        }
        for id in AgentId::ALL {
            if let Some(text) = read_override(dir, id.as_str())? {
                registry.prompts.insert(id, text);
            }
        }

        Ok(registry)
    }

    pub fn main_prompt(&self) -> &str {
        &self.main_prompt
    }

    pub fn prompt(&self, agent: AgentId) -> &str {
        self.prompts
            .get(&agent)
            .map(String::as_str)
            .unwrap_or_else(|| prompts::default_agent_prompt(agent))
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn read_override(dir: &Path, name: &str) -> Result<Option<String>> {
    let path = dir.join(format!("{}.md", name));
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    tracing::info!(prompt = name, path = %path.display(), "Loaded prompt override");
    Ok(Some(text))
}
