//! Router - classifies each user turn
//!
//! Wraps one LLM call per turn. Whatever the model does (answers, rambles,
//! errors out, hangs) the caller gets a `RoutingDecision` back.

pub mod decision;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::{truncate_chars, Config, Role};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::session::SessionState;

pub use decision::{parse_router_response, Intent, IntentKind, RoutingDecision};

/// Agent name recorded against router decisions in the conversation log
pub const ROUTER_LOG_NAME: &str = "Router";
/// Agent name recorded against user input when no agent is active yet
const UNROUTED_LOG_NAME: &str = "RouterCaller";

/// Picks the agent for each turn
#[derive(Clone)]
pub struct Router {
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl Router {
    /// Create a router with default temperature and timeout
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        let defaults = crate::core::config::RouterConfig::default();
        Self {
            llm,
            model: model.into(),
            temperature: defaults.temperature,
            timeout: defaults.timeout(),
        }
    }

    /// Create a router from configuration
    pub fn from_config(llm: Arc<dyn LLMProvider>, config: &Config) -> Self {
        Self {
            llm,
            model: config.models.router.clone(),
            temperature: config.router.temperature,
            timeout: config.router.timeout(),
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model used for routing
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Classify `user_input` against the session. Never fails.
    pub async fn determine_next_agent(
        &self,
        user_input: &str,
        session: &SessionState,
    ) -> RoutingDecision {
        let context = session.prepare_routing_context();

        session.record_turn(
            Role::User,
            user_input,
            Some(context.current_agent.as_deref().unwrap_or(UNROUTED_LOG_NAME)),
        );

        debug!(
            input = truncate_chars(user_input, 100),
            current_agent = context.current_agent.as_deref().unwrap_or("None"),
            state = %context.state_summary,
            flows = %context.flow_stack_summary,
            "invoking router"
        );

        let messages = prompt::build_messages(user_input, &context);
        let options = GenerateOptions {
            temperature: Some(self.temperature),
            json_mode: true,
            ..Default::default()
        };

        let call = self.llm.chat(&self.model, &messages, Some(options));
        let decision = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => parse_router_response(&response.content),
            Ok(Err(e)) => {
                error!(provider = self.llm.name(), error = %e, "router LLM call failed");
                RoutingDecision::router_unavailable(e.to_string())
            }
            Err(_) => {
                warn!(
                    provider = self.llm.name(),
                    timeout_secs = self.timeout.as_secs_f32(),
                    "router LLM call timed out"
                );
                RoutingDecision::router_unavailable(format!(
                    "no response within {:.1}s",
                    self.timeout.as_secs_f32()
                ))
            }
        };

        info!(
            intent = %decision.intent,
            target = %decision.target_agent,
            interruption = decision.is_interruption,
            resume_after = decision.should_resume_after,
            confidence = decision.confidence,
            "routing decision"
        );
        session.record_turn(Role::System, &decision.audit_line(), Some(ROUTER_LOG_NAME));

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssistantError, Message, Result};
    use crate::llm::LLMResponse;
    use crate::session::MemoryConversationLogger;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct StubLlm {
        reply: Reply,
        seen: Mutex<Vec<(Vec<Message>, bool)>>,
    }

    impl StubLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for StubLlm {
        async fn chat(
            &self,
            model: &str,
            messages: &[Message],
            options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            let json_mode = options.map(|o| o.json_mode).unwrap_or(false);
            self.seen.lock().unwrap().push((messages.to_vec(), json_mode));
            match self.reply {
                Reply::Text(text) => Ok(LLMResponse::text(model, text)),
                Reply::Fail => Err(AssistantError::llm("connection refused")),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(LLMResponse::text(model, "{}"))
                }
            }
        }

        async fn is_model_available(&self, _model: &str) -> Result<bool> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["stub".to_string()])
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_routes_greeting() {
        let llm = StubLlm::new(Reply::Text(
            r#"{"intent": "new_flow_greeting", "target_agent": "Greeter", "is_interruption": false, "should_resume_after": false, "confidence": 0.95, "reason": "hello"}"#,
        ));
        let router = Router::new(llm.clone(), "stub-model");
        let session = SessionState::new();

        let decision = router.determine_next_agent("Hello!", &session).await;

        assert_eq!(decision.intent.to_string(), "new_flow_greeting");
        assert_eq!(decision.target_agent, "Greeter");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (messages, json_mode) = &seen[0];
        assert!(json_mode);
        assert_eq!(messages.last().unwrap().content, "Hello!");
    }

    #[tokio::test]
    async fn test_garbage_reply_falls_back_to_greeter() {
        let router = Router::new(StubLlm::new(Reply::Text("I think Planner?")), "m");
        let decision = router.determine_next_agent("hi", &SessionState::new()).await;

        assert_eq!(decision.intent.kind(), IntentKind::ParseError);
        assert_eq!(decision.target_agent, "Greeter");
    }

    #[tokio::test]
    async fn test_llm_failure_is_router_unavailable() {
        let router = Router::new(StubLlm::new(Reply::Fail), "m");
        let decision = router.determine_next_agent("hi", &SessionState::new()).await;

        assert!(decision.is_router_failure());
        assert_eq!(decision.target_agent, "FallbackAgent");
        assert_eq!(decision.confidence, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_router_unavailable() {
        let router = Router::new(StubLlm::new(Reply::Hang), "m").with_timeout(Duration::from_secs(5));
        let decision = router.determine_next_agent("hi", &SessionState::new()).await;

        assert_eq!(decision.intent.to_string(), "error_router_unavailable");
        assert_eq!(decision.target_agent, "FallbackAgent");
    }

    #[tokio::test]
    async fn test_audit_records_after_identification() {
        let logger = Arc::new(MemoryConversationLogger::new());
        let mut session = SessionState::with_logger(logger.clone());
        let router = Router::new(
            StubLlm::new(Reply::Text(r#"{"intent": "new_flow", "target_agent": "Planner"}"#)),
            "m",
        );

        router.determine_next_agent("before login", &session).await;
        assert!(logger.is_empty());

        session.set_user(12).unwrap();
        session.set_current_agent("Greeter");
        router.determine_next_agent("plan my meals", &session).await;

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, Role::User);
        assert_eq!(records[0].agent_name, "Greeter");
        assert_eq!(records[0].message, "plan my meals");
        assert_eq!(records[1].role, Role::System);
        assert_eq!(records[1].agent_name, ROUTER_LOG_NAME);
        assert!(records[1].message.starts_with("Router: int='new_flow', tgt='Planner'"));
    }

    #[tokio::test]
    async fn test_router_does_not_touch_session() {
        let router = Router::new(
            StubLlm::new(Reply::Text(r#"{"intent": "resume_flow", "target_agent": "Planner"}"#)),
            "m",
        );
        let mut session = SessionState::new();
        session.set_current_agent("HealthMonitor");
        let before = session.snapshot_context();

        router.determine_next_agent("back", &session).await;

        assert_eq!(session.snapshot_context(), before);
    }
}
