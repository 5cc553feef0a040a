//! LLM module - completion endpoint integration
//!
//! Provides the provider abstraction, the OpenAI-compatible client and
//! credential resolution.

pub mod credentials;
pub mod openai;
pub mod traits;

pub use credentials::CredentialResolver;
pub use openai::{OpenAiClient, OpenAiFactory};
pub use traits::{LLMProvider, ProviderFactory};
