//! Health Assistant - multi-agent conversational health assistant
//!
//! A router model classifies every user message and hands it to one of a
//! fixed set of specialist agents. Conversations can be interrupted and
//! resumed: the active flow is suspended on a per-session stack and picked
//! up again later.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: LLM provider abstraction with Ollama implementation
//! - **Session**: Per-conversation state, transcript and audit logging
//! - **Flow**: Suspended-flow stack and the flow decision resolver
//! - **Router**: Turns a message into a validated routing decision
//! - **Agent**: The specialist agents and their registry
//! - **Dispatch**: The turn loop tying it all together
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use health_assistant::{AgentServices, Assistant, Config, OllamaClient, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> health_assistant::Result<()> {
//!     let config = Config::load();
//!     let llm = Arc::new(OllamaClient::from_config(&config)?);
//!     let services = AgentServices::in_memory(config.users.clone());
//!     let assistant = Assistant::from_config(llm, services, &config)?;
//!
//!     let mut session = SessionState::new();
//!     println!("{}", assistant.start_session(&mut session).await.response);
//!     println!("{}", assistant.process_turn(&mut session, "42").await.response);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod dispatch;
pub mod flow;
pub mod llm;
pub mod router;
pub mod session;

// Re-export commonly used items
pub use agent::{
    AgentHandler, AgentName, AgentRegistry, AgentServices, InMemoryUserDirectory, UserDirectory,
};
pub use cli::Repl;
pub use core::{AssistantError, Config, Result};
pub use dispatch::{Assistant, TurnOutcome, TurnStatus};
pub use flow::{FlowResolver, FlowStack};
pub use llm::{LLMProvider, OllamaClient};
pub use router::{Router, RoutingDecision};
pub use session::SessionState;
