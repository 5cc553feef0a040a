//! Configuration management for Quill
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/quill/config.toml

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::core::error::{QuillError, Result};

/// Main configuration for Quill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Completion endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Orchestration behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Plain chat mode
    #[serde(default)]
    pub chat: ChatConfig,
    /// Sandbox for the file tool
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Credential aliases
    #[serde(default)]
    pub credentials: CredentialConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: String,
    /// Port number (default: 3001)
    pub port: u16,
}

/// OpenAI-compatible completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL, the client appends `/chat/completions`
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Each message is truncated to this many characters before sending
    pub max_message_chars: usize,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM calls allowed for the main agent per request
    /// Default: 8
    pub max_iterations: usize,
    /// LLM calls allowed per sub-agent delegation
    /// Default: 5
    pub max_sub_agent_iterations: usize,
    /// Delay between streamed characters of the final answer
    pub typing_delay_ms: u64,
    /// Tool results serializing longer than this are summarized
    pub compact_threshold: usize,
    /// Unsaved editor content is truncated to this many characters
    pub editor_context_max_chars: usize,
    /// Directory with `<agent_id>.md` prompt overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
    /// Whether to log LLM traffic at debug level
    pub debug: bool,
}

/// Plain chat mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// LLM calls allowed per chat request
    pub max_iterations: usize,
}

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Root directory all file operations are confined to
    pub data_dir: PathBuf,
}

/// Credential aliases, e.g. `test = "sk-..."`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("QUILL_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.lkeap.cloud.tencent.com/v1".to_string()),
            model: env::var("QUILL_MODEL").unwrap_or_else(|_| "deepseek-v3.1".to_string()),
            timeout_secs: env::var("QUILL_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(120),
            max_message_chars: 8000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            max_sub_agent_iterations: 5,
            typing_delay_ms: 20,
            compact_threshold: 500,
            editor_context_max_chars: 8000,
            prompts_dir: env::var("QUILL_PROMPTS_DIR").ok().map(PathBuf::from),
            debug: env::var("DEBUG_LLM")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            data_dir: env::var("QUILL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from(&Self::config_file()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuillError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| QuillError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| QuillError::config(format!("Failed to parse config: {}", e)))
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

impl LlmConfig {
    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> Result<Url> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Ok(Url::parse(&base)?.join("chat/completions")?)
    }
}
