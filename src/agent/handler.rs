//! Agent handler contract

use async_trait::async_trait;

use crate::core::Result;
use crate::session::SessionState;

/// What an agent says back for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    /// Text shown to the user
    pub text: String,
    /// Whether the agent wants to keep the floor next turn
    pub should_continue: bool,
}

impl AgentReply {
    /// Reply that keeps the agent active
    pub fn continuing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            should_continue: true,
        }
    }

    /// Reply that ends the agent's flow
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            should_continue: false,
        }
    }
}

/// A specialist the dispatch loop can hand a turn to
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Name the router uses for this agent
    fn name(&self) -> &str;

    /// Handle one turn. `input` may be empty (initial greeting) or a
    /// placeholder when a resumed flow had no recorded input.
    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply>;
}
