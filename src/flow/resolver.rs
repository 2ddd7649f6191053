//! Flow decision resolver
//!
//! Turns a `RoutingDecision` into what runs this turn. Interruptions that
//! want to come back suspend the active flow onto the session's stack;
//! `resume_flow` pops it back. Everything else switches to the target.

use tracing::{debug, info, warn};

use crate::flow::stack::{FlowFrame, PendingInput};
use crate::router::RoutingDecision;
use crate::session::SessionState;

/// What the dispatch loop should run this turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub agent_name: String,
    pub input: String,
    /// True when the agent is picking up a previously suspended flow
    pub is_resumed_flow: bool,
}

impl Resolution {
    fn fresh(agent_name: &str, input: &str) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            input: input.to_string(),
            is_resumed_flow: false,
        }
    }
}

/// Stateless; all flow state lives in the session
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowResolver;

impl FlowResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a decision against `session`, pushing or popping its flow
    /// stack and updating the current agent as needed.
    pub fn resolve(
        &self,
        decision: &RoutingDecision,
        session: &mut SessionState,
        user_input: &str,
    ) -> Resolution {
        if decision.is_interruption {
            if decision.should_resume_after {
                self.suspend_current(session);
            }
            session.set_current_agent(decision.target_agent.as_str());
            debug!(target_agent = %decision.target_agent, "interruption routed");
            return Resolution::fresh(&decision.target_agent, user_input);
        }

        if decision.intent.is_resume() {
            if session.flow_stack().has_pending() {
                if let Some(resolution) = self.resume_top(session) {
                    return resolution;
                }
                warn!("flow stack reported a pending flow but pop returned nothing");
            } else {
                warn!(
                    target_agent = %decision.target_agent,
                    "resume requested with no suspended flow, running target"
                );
            }
        }

        session.set_current_agent(decision.target_agent.as_str());
        Resolution::fresh(&decision.target_agent, user_input)
    }

    fn suspend_current(&self, session: &mut SessionState) {
        let Some(agent) = session.current_agent_name().map(String::from) else {
            debug!("interruption with no active agent, nothing to suspend");
            return;
        };

        let pending = PendingInput::from_recorded(session.task_input_for(&agent));
        if !pending.is_captured() {
            warn!(agent = %agent, "no recorded input for interrupted flow, using placeholder");
        }

        let frame = FlowFrame::new(
            agent.as_str(),
            session.snapshot_context(),
            session.conversation_state().clone(),
            pending,
        );

        if let Some(evicted) = session.flow_stack_mut().push(frame) {
            warn!(
                evicted_agent = %evicted.agent_name(),
                suspended_at = %evicted.suspended_at(),
                "flow stack full, dropped oldest suspended flow"
            );
        }

        info!(
            agent = %agent,
            depth = session.flow_stack().len(),
            "suspended flow"
        );
    }

    fn resume_top(&self, session: &mut SessionState) -> Option<Resolution> {
        let frame = session.flow_stack_mut().pop()?;
        let (agent_name, snapshot, agent_state, pending) = frame.into_parts();

        session.apply_snapshot(snapshot);
        session.replace_conversation_state(agent_state);
        session.set_current_agent(agent_name.as_str());

        info!(
            agent = %agent_name,
            remaining = session.flow_stack().len(),
            "resumed flow"
        );

        Some(Resolution {
            input: pending.as_agent_input().to_string(),
            agent_name,
            is_resumed_flow: true,
        })
    }
}
