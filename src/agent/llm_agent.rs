//! LLM-backed conversational agent
//!
//! A named system prompt plus the recent transcript, sent to an
//! `LLMProvider`. The agent gives up the floor when its reply announces a
//! hand-off.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::handler::{AgentHandler, AgentReply};
use crate::core::{display_value, AssistantError, Config, Message, Result, Role};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::session::SessionState;

/// Phrases that mark a reply as handing the conversation to another agent
pub const HANDOFF_PHRASES: [&str; 3] = ["handing off to", "transferring to", "now to"];

const EMPTY_REPLY: &str = "I seem to be at a loss for words. Could you try rephrasing?";

/// Whether `reply` hands the conversation off
pub fn signals_handoff(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    HANDOFF_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Append bracketed notes for the model after the user's text
pub fn with_notes(input: &str, notes: &[String]) -> String {
    if notes.is_empty() {
        input.to_string()
    } else {
        format!("{}\n\n{}", input, notes.join("\n"))
    }
}

/// An agent whose replies come from a language model
#[derive(Clone)]
pub struct LlmAgent {
    name: String,
    instructions: String,
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    context_window: usize,
}

/// Builder for creating LlmAgents
pub struct LlmAgentBuilder {
    name: String,
    instructions: Option<String>,
    llm: Option<Arc<dyn LLMProvider>>,
    model: Option<String>,
    temperature: f32,
    context_window: usize,
}

impl LlmAgentBuilder {
    /// Create a new builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            name: name.into(),
            instructions: None,
            llm: None,
            model: None,
            temperature: defaults.agent.temperature,
            context_window: defaults.agent.context_window,
        }
    }

    /// Set the system prompt
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the LLM provider
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the model to use
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Number of transcript messages sent along with each request
    pub fn context_window(mut self, messages: usize) -> Self {
        self.context_window = messages;
        self
    }

    /// Take model, temperature and window from configuration
    pub fn config(self, config: &Config) -> Self {
        self.model(config.models.agents.clone())
            .temperature(config.agent.temperature)
            .context_window(config.agent.context_window)
    }

    /// Build the LlmAgent
    pub fn build(self) -> Result<LlmAgent> {
        let llm = self.llm.ok_or_else(|| {
            AssistantError::agent(format!("agent '{}' needs an LLM provider", self.name))
        })?;

        Ok(LlmAgent {
            instructions: self.instructions.unwrap_or_else(|| {
                format!(
                    "You are the {} agent of a health assistant. Be brief and helpful.",
                    self.name
                )
            }),
            model: self
                .model
                .unwrap_or_else(|| Config::default().models.agents),
            name: self.name,
            llm,
            temperature: self.temperature,
            context_window: self.context_window,
        })
    }
}

impl LlmAgent {
    /// Create a builder
    pub fn builder(name: impl Into<String>) -> LlmAgentBuilder {
        LlmAgentBuilder::new(name)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a reply to `prompt` in the context of `session`
    pub async fn reply(&self, prompt: &str, session: &SessionState) -> Result<String> {
        let messages = self.build_messages(prompt, session);
        debug!(
            agent = %self.name,
            model = %self.model,
            messages = messages.len(),
            "calling agent model"
        );

        let response = self
            .llm
            .chat(
                &self.model,
                &messages,
                Some(GenerateOptions {
                    temperature: Some(self.temperature),
                    ..Default::default()
                }),
            )
            .await?;

        Ok(response.content.trim().to_string())
    }

    fn build_messages(&self, prompt: &str, session: &SessionState) -> Vec<Message> {
        let mut messages = vec![Message::system(format!(
            "{}\n\n{}",
            self.instructions,
            session_context(session)
        ))];

        let mut history = session.transcript().context_window(self.context_window);
        // The dispatch loop has already added this turn's input
        if history
            .last()
            .is_some_and(|m| m.role == Role::User)
        {
            history.pop();
        }
        messages.extend(history);

        messages.push(Message::user(prompt));
        messages
    }
}

#[async_trait]
impl AgentHandler for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply> {
        let text = self.reply(input, session).await?;
        if text.is_empty() {
            return Ok(AgentReply::continuing(EMPTY_REPLY));
        }

        let should_continue = !signals_handoff(&text);
        Ok(AgentReply {
            text,
            should_continue,
        })
    }
}

/// What an agent knows about the user and the task at hand
fn session_context(session: &SessionState) -> String {
    let mut lines = vec!["## Session".to_string()];

    match session.profile() {
        Some(profile) => {
            lines.push(format!("- user: {}", profile.first_name));
            if let Some(diet) = &profile.dietary_preference {
                lines.push(format!("- dietary preference: {}", diet));
            }
        }
        None => lines.push("- user: not identified".to_string()),
    }

    for (key, value) in session.conversation_state() {
        lines.push(format!("- {}: {}", key, display_value(value)));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::UserProfile;
    use crate::llm::LLMResponse;
    use std::sync::Mutex;

    struct EchoLlm {
        reply: String,
        last_request: Mutex<Vec<Message>>,
    }

    impl EchoLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                last_request: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for EchoLlm {
        async fn chat(
            &self,
            model: &str,
            messages: &[Message],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            *self.last_request.lock().unwrap() = messages.to_vec();
            Ok(LLMResponse::text(model, self.reply.clone()))
        }

        async fn is_model_available(&self, _model: &str) -> Result<bool> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_handoff_detection() {
        assert!(signals_handoff("Thanks! Handing off to the health check."));
        assert!(signals_handoff("Let's move now to your readings"));
        assert!(!signals_handoff("How are you feeling today?"));
    }

    #[test]
    fn test_build_requires_llm() {
        let result = LlmAgent::builder("WellBeing").build();
        assert!(matches!(result, Err(AssistantError::Agent(_))));
    }

    #[tokio::test]
    async fn test_reply_and_continuation() {
        let llm = EchoLlm::new("  How are you feeling today, Ada?  ");
        let agent = LlmAgent::builder("WellBeing")
            .instructions("Check in.")
            .llm(llm.clone())
            .model("test-model")
            .build()
            .unwrap();

        let mut session = SessionState::new();
        session.set_user(1).unwrap();
        session.attach_profile(UserProfile::new(1, "Ada"));
        session.transcript_mut().add_assistant("Hi Ada!");
        session.transcript_mut().add_user("hello");

        let reply = agent.handle("hello", &mut session).await.unwrap();
        assert_eq!(reply.text, "How are you feeling today, Ada?");
        assert!(reply.should_continue);

        let request = llm.last_request.lock().unwrap().clone();
        assert_eq!(request.len(), 3);
        assert_eq!(request[0].role, Role::System);
        assert!(request[0].content.contains("- user: Ada"));
        assert_eq!(request[1].content, "Hi Ada!");
        assert_eq!(request[2].content, "hello");
    }

    #[tokio::test]
    async fn test_handoff_reply_finishes() {
        let agent = LlmAgent::builder("WellBeing")
            .llm(EchoLlm::new("Thank you for sharing. Handing off to the health check."))
            .build()
            .unwrap();

        let reply = agent.handle("tired", &mut SessionState::new()).await.unwrap();
        assert!(!reply.should_continue);
    }

    #[tokio::test]
    async fn test_empty_reply_is_replaced() {
        let agent = LlmAgent::builder("GeneralQuery")
            .llm(EchoLlm::new("   "))
            .build()
            .unwrap();

        let reply = agent.handle("why?", &mut SessionState::new()).await.unwrap();
        assert_eq!(reply.text, EMPTY_REPLY);
        assert!(reply.should_continue);
    }
}
