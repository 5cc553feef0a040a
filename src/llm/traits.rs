//! LLM Provider trait for abstracting the completion backend
//!
//! The orchestrator only ever needs one assistant message per call, so the
//! trait is a single non-streaming `complete`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Message, Result};

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the message list and return the assistant's reply text.
    ///
    /// Returns an empty string when the endpoint answers without content.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Builds a provider for one request's bearer token
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn LLMProvider>>;
}
