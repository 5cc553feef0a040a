//! Credential resolution
//!
//! The browser sends either a real key or a short alias configured on the
//! server; aliases are swapped for their token before any upstream call.

use std::collections::HashMap;

use crate::core::config::CredentialConfig;

#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    aliases: HashMap<String, String>,
}

impl CredentialResolver {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn from_config(config: &CredentialConfig) -> Self {
        Self::new(config.aliases.clone())
    }

    /// Resolve a caller-supplied key into a bearer token.
    ///
    /// Returns `None` for a blank key.
    pub fn resolve(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(token) = self.aliases.get(input) {
            tracing::info!(alias = input, "Using configured key alias");
            return Some(token.clone());
        }

        Some(input.to_string())
    }
}
