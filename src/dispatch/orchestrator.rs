//! Dispatch loop
//!
//! One user turn: route, resolve the flow, run the chosen agent. Every
//! failure along the way ends in a user-facing message, never an error.
//!
//! Turns are staged on a clone of the session and committed by assignment
//! once the agent has answered, so a turn that is dropped half way leaves
//! the caller's session exactly as it was.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::agent::{AgentHandler, AgentName, AgentRegistry, AgentServices};
use crate::core::{AssistantError, Config, Result, Role};
use crate::flow::{FlowResolver, Resolution};
use crate::llm::LLMProvider;
use crate::router::{Router, RoutingDecision};
use crate::session::SessionState;

/// Shown when the router itself could not be reached
pub const ROUTER_FAILURE_REPLY: &str =
    "I'm sorry, I'm having trouble understanding right now. Could you say that again?";
/// Shown when the router picked an agent nobody implements
pub const UNKNOWN_AGENT_REPLY: &str =
    "I'm sorry, I'm not sure how to help with that yet. Could you try asking another way?";
/// Shown when an agent failed while handling the turn
pub const HANDLER_FAILURE_REPLY: &str =
    "I'm sorry, something went wrong on my side. Please try again in a moment.";

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The agent wants the next turn as well
    Continuing,
    /// The agent finished its flow; the router picks what comes next
    FlowFinished,
    /// No handler for the resolved agent; routing changes were discarded
    UnknownAgent,
    /// The handler failed; the user got an apology
    HandlerFailed,
}

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Text for the user
    pub response: String,
    /// Agent that handled the turn, if any did
    pub agent: Option<String>,
    /// Router decision behind the turn (absent for the opening greeting)
    pub decision: Option<RoutingDecision>,
    pub is_resumed_flow: bool,
    pub status: TurnStatus,
}

/// The assistant: router, resolver and agents, shared by any number of
/// sessions. Sessions are passed in per call and never stored.
pub struct Assistant {
    llm: Arc<dyn LLMProvider>,
    router: Router,
    registry: AgentRegistry,
    resolver: FlowResolver,
    required_models: Vec<String>,
    offer_resume: bool,
}

impl Assistant {
    /// Create an assistant from its parts
    pub fn new(llm: Arc<dyn LLMProvider>, router: Router, registry: AgentRegistry) -> Self {
        let required_models = vec![router.model().to_string()];
        Self {
            llm,
            router,
            registry,
            resolver: FlowResolver::new(),
            required_models,
            offer_resume: true,
        }
    }

    /// Create an assistant with the default agents, configured from `config`
    pub fn from_config(
        llm: Arc<dyn LLMProvider>,
        services: AgentServices,
        config: &Config,
    ) -> Result<Self> {
        let router = Router::from_config(llm.clone(), config);
        let registry = AgentRegistry::with_defaults(llm.clone(), &services, config)?;

        let mut assistant = Self::new(llm, router, registry).with_offer_resume(config.flow.offer_resume);
        if !assistant.required_models.contains(&config.models.agents) {
            assistant.required_models.push(config.models.agents.clone());
        }
        Ok(assistant)
    }

    /// Whether to offer returning to a suspended flow when one finishes
    pub fn with_offer_resume(mut self, offer: bool) -> Self {
        self.offer_resume = offer;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Check the backend is reachable and has every model we use
    pub async fn initialize(&self) -> Result<()> {
        let models = self.llm.list_models().await?;
        debug!(provider = self.llm.name(), ?models, "available models");

        for model in &self.required_models {
            if !self.llm.is_model_available(model).await? {
                return Err(AssistantError::ModelNotFound(model.clone()));
            }
        }
        Ok(())
    }

    /// Opening turn: the Greeter runs with empty input
    pub async fn start_session(&self, session: &mut SessionState) -> TurnOutcome {
        let greeter = AgentName::Greeter.as_str();
        let Some(handler) = self.registry.get(greeter) else {
            error!("no Greeter registered, cannot open session");
            session.increment_interactions();
            return Self::unhandled(UNKNOWN_AGENT_REPLY, None);
        };

        let mut staged = session.clone();
        staged.set_current_agent(greeter);
        let resolution = Resolution {
            agent_name: greeter.to_string(),
            input: String::new(),
            is_resumed_flow: false,
        };

        let outcome = self.run_agent(handler, &resolution, "", &mut staged, None).await;
        *session = staged;
        outcome
    }

    /// Process one user turn against `session`
    pub async fn process_turn(&self, session: &mut SessionState, user_input: &str) -> TurnOutcome {
        let decision = self.router.determine_next_agent(user_input, session).await;

        let mut staged = session.clone();
        let resolution = self.resolver.resolve(&decision, &mut staged, user_input);
        debug!(
            agent = %resolution.agent_name,
            resumed = resolution.is_resumed_flow,
            "resolved turn"
        );

        let Some(handler) = self.registry.get(&resolution.agent_name) else {
            let reply = if decision.is_router_failure() {
                ROUTER_FAILURE_REPLY
            } else {
                UNKNOWN_AGENT_REPLY
            };
            warn!(
                agent = %resolution.agent_name,
                current_agent = session.current_agent_name().unwrap_or("None"),
                "no handler for resolved agent, keeping current flow"
            );

            // The staged resolution is dropped; only the exchange itself is kept
            session.transcript_mut().add_user(user_input);
            session.transcript_mut().add_assistant(reply);
            session.record_turn(Role::Assistant, reply, session.current_agent_name());
            session.increment_interactions();
            return Self::unhandled(reply, Some(decision));
        };

        let outcome = self
            .run_agent(handler, &resolution, user_input, &mut staged, Some(decision))
            .await;
        *session = staged;
        outcome
    }

    async fn run_agent(
        &self,
        handler: Arc<dyn AgentHandler>,
        resolution: &Resolution,
        user_input: &str,
        session: &mut SessionState,
        decision: Option<RoutingDecision>,
    ) -> TurnOutcome {
        let agent = resolution.agent_name.as_str();

        session.begin_task(agent, resolution.input.as_str());
        if !user_input.trim().is_empty() {
            session.transcript_mut().add_user(user_input);
        }

        let (response, status) = match handler.handle(&resolution.input, session).await {
            Ok(reply) if reply.should_continue => (reply.text, TurnStatus::Continuing),
            Ok(reply) => (self.with_resume_offer(reply.text, agent, session), TurnStatus::FlowFinished),
            Err(e) => {
                error!(agent, error = %e, "agent failed to handle turn");
                (HANDLER_FAILURE_REPLY.to_string(), TurnStatus::HandlerFailed)
            }
        };

        session.transcript_mut().add_assistant(response.as_str());
        session.record_turn(Role::Assistant, &response, Some(agent));
        session.increment_interactions();

        info!(
            agent,
            status = ?status,
            resumed = resolution.is_resumed_flow,
            interactions = session.interaction_count(),
            "turn complete"
        );

        TurnOutcome {
            response,
            agent: Some(agent.to_string()),
            decision,
            is_resumed_flow: resolution.is_resumed_flow,
            status,
        }
    }

    fn with_resume_offer(&self, mut text: String, agent: &str, session: &SessionState) -> String {
        if !self.offer_resume {
            return text;
        }
        if let Some(top) = session.flow_stack().peek() {
            if top.agent_name() != agent {
                text.push_str(&format!(
                    "\n\nWe were in the middle of something with {}. Would you like to pick that up again?",
                    top.agent_name()
                ));
            }
        }
        text
    }

    fn unhandled(reply: &str, decision: Option<RoutingDecision>) -> TurnOutcome {
        TurnOutcome {
            response: reply.to_string(),
            agent: None,
            decision,
            is_resumed_flow: false,
            status: TurnStatus::UnknownAgent,
        }
    }
}
