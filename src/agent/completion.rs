//! Closing agent for finished conversations

use async_trait::async_trait;

use crate::agent::handler::{AgentHandler, AgentReply};
use crate::agent::AgentName;
use crate::core::Result;
use crate::session::{SessionState, CURRENT_TASK_KEY};

/// Says goodbye and clears any open task
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionAgent;

#[async_trait]
impl AgentHandler for CompletionAgent {
    fn name(&self) -> &str {
        AgentName::Done.as_str()
    }

    async fn handle(&self, _input: &str, session: &mut SessionState) -> Result<AgentReply> {
        session.remove_state(CURRENT_TASK_KEY);

        let name = session
            .profile()
            .map(|p| format!(", {}", p.first_name))
            .unwrap_or_default();
        Ok(AgentReply::finished(format!(
            "Thanks for checking in{}. Take care, and see you next time!",
            name
        )))
    }
}
