//! Custom error types for the assistant
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for assistant operations
#[derive(Error, Debug)]
pub enum AssistantError {
    /// LLM backend connection or API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM call did not finish in time
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Agent handler failures
    #[error("Agent error: {0}")]
    Agent(String),

    /// No handler registered under this name
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// The session already has an authenticated user
    #[error("Session user is already set to {0}")]
    UserAlreadySet(i64),

    /// Conversation log collaborator failures
    #[error("Conversation log error: {0}")]
    ConversationLog(String),

    /// A health record failed validation
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Health record storage failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

impl AssistantError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a record validation error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Create a record storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a conversation log error
    pub fn logger(msg: impl Into<String>) -> Self {
        Self::ConversationLog(msg.into())
    }
}
