//! Scripted LLM backends for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use health_assistant::agent::{AgentServices, UserProfile};
use health_assistant::core::{AssistantError, Message, Result, Role};
use health_assistant::llm::{GenerateOptions, LLMProvider, LLMResponse};
use health_assistant::session::{ConversationLogger, MemoryConversationLogger, SessionState};
use health_assistant::{Assistant, Config};

pub const ROUTER_MODEL: &str = "router-model";
pub const AGENT_MODEL: &str = "agent-model";

/// One scripted router reply
pub enum RouterStep {
    Reply(String),
    Fail,
    Hang,
}

impl RouterStep {
    pub fn decision(intent: &str, target: &str, interruption: bool, resume: bool) -> Self {
        RouterStep::Reply(format!(
            r#"{{"intent": "{}", "target_agent": "{}", "is_interruption": {}, "should_resume_after": {}, "confidence": 0.9, "reason": "scripted"}}"#,
            intent, target, interruption, resume
        ))
    }
}

/// Router calls (JSON mode) are answered from a queue; agent calls get a
/// fixed reply.
pub struct ScriptedLlm {
    router_steps: Mutex<VecDeque<RouterStep>>,
    agent_reply: String,
    agent_prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(steps: Vec<RouterStep>) -> Arc<Self> {
        Arc::new(Self {
            router_steps: Mutex::new(steps.into()),
            agent_reply: "Happy to help with that.".to_string(),
            agent_prompts: Mutex::new(Vec::new()),
        })
    }

    /// Last user message of every agent call, in order
    pub fn agent_prompts(&self) -> Vec<String> {
        self.agent_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let is_router = options.map(|o| o.json_mode).unwrap_or(false);
        if !is_router {
            let prompt = last_user_message(messages);
            self.agent_prompts.lock().unwrap().push(prompt);
            return Ok(LLMResponse::text(model, self.agent_reply.clone()));
        }

        let step = self.router_steps.lock().unwrap().pop_front();
        match step {
            Some(RouterStep::Reply(text)) => Ok(LLMResponse::text(model, text)),
            Some(RouterStep::Fail) | None => Err(AssistantError::llm("router backend unavailable")),
            Some(RouterStep::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AssistantError::llm("unreachable"))
            }
        }
    }

    async fn is_model_available(&self, model: &str) -> Result<bool> {
        Ok(model == ROUTER_MODEL || model == AGENT_MODEL)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![ROUTER_MODEL.to_string(), AGENT_MODEL.to_string()])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Routes by keyword, so many sessions can share it in any interleaving
pub struct KeywordRouterLlm;

#[async_trait]
impl LLMProvider for KeywordRouterLlm {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let is_router = options.map(|o| o.json_mode).unwrap_or(false);
        if !is_router {
            return Ok(LLMResponse::text(model, "Noted, thank you."));
        }

        // Give other sessions a chance to interleave
        tokio::task::yield_now().await;

        let input = last_user_message(messages).to_lowercase();
        let step = if input.contains("weather") {
            RouterStep::decision("interruption_query", "GeneralQuery", true, true)
        } else if input.contains("back") {
            RouterStep::decision("resume_flow", "HealthMonitor", false, false)
        } else if input.contains("glucose") || input.contains("reading") {
            RouterStep::decision("new_flow_health_check", "HealthMonitor", false, false)
        } else {
            RouterStep::decision("new_flow_greeting", "Greeter", false, false)
        };

        match step {
            RouterStep::Reply(text) => Ok(LLMResponse::text(model, text)),
            _ => Err(AssistantError::llm("unreachable")),
        }
    }

    async fn is_model_available(&self, _model: &str) -> Result<bool> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn last_user_message(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.models.router = ROUTER_MODEL.to_string();
    config.models.agents = AGENT_MODEL.to_string();
    config.router.timeout_secs = 2;
    config.users = (1..=8)
        .map(|id| UserProfile::new(id, format!("User{}", id)))
        .chain([UserProfile::new(42, "Ada")])
        .collect();
    config
}

pub fn assistant(llm: Arc<dyn LLMProvider>, config: &Config) -> Assistant {
    Assistant::from_config(llm, AgentServices::in_memory(config.users.clone()), config).unwrap()
}

pub fn session(config: &Config) -> (SessionState, Arc<MemoryConversationLogger>) {
    let logger = Arc::new(MemoryConversationLogger::new());
    let session = SessionState::from_config(config, logger.clone() as Arc<dyn ConversationLogger>);
    (session, logger)
}
