//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction consumed by the router and agents, with
//! Ollama as the bundled backend.

pub mod ollama;
pub mod traits;

pub use ollama::OllamaClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
