//! Custom error types for Quill
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Quill operations
#[derive(Error, Debug)]
pub enum QuillError {
    /// Completion endpoint answered with a non-success status
    #[error("LLM request failed: {status} {body}")]
    Upstream { status: u16, body: String },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed endpoint URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A resolved path escaped the sandbox root
    #[error("Access denied")]
    AccessDenied,

    /// The client went away; remaining work was abandoned
    #[error("Request cancelled")]
    Cancelled,

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Quill operations
pub type Result<T> = std::result::Result<T, QuillError>;

impl QuillError {
    /// Create an upstream error from a status code and response body
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the completion endpoint rejected the credential.
    ///
    /// Some gateways answer with a non-401 status but still carry a
    /// "not authorized" marker in the body, so both are checked.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Upstream { status: 401, .. } => true,
            Self::Upstream { body, .. } => mentions_not_authorized(body),
            Self::Other(msg) => mentions_not_authorized(msg),
            _ => false,
        }
    }
}

fn mentions_not_authorized(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("not authorized") || lower.contains("not_authorized_error")
}
