//! Session state
//!
//! Per-conversation record: identity, active agent, interaction counter,
//! agent-owned task state, and the session's own flow stack.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agent::UserProfile;
use crate::core::{display_value, truncate_chars, AssistantError, Config, Result, Role, StateMap};
use crate::flow::FlowStack;
use crate::session::conversation::Conversation;
use crate::session::logger::{ConversationLogger, ConversationRecord, TracingConversationLogger};

/// Default characters of the current task shown to the router
pub const DEFAULT_SUMMARY_CHARS: usize = 50;

/// Key agents use in `conversation_state` to describe what they are waiting on
pub const CURRENT_TASK_KEY: &str = "current_task";

/// Immutable copy of the externally visible session context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: Option<i64>,
    pub session_id: String,
    pub current_agent_name: Option<String>,
    pub interaction_count: u64,
    pub conversation_state: StateMap,
}

/// Read-only bundle the router classifies against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingContext {
    pub current_agent: Option<String>,
    pub state_summary: String,
    pub flow_stack_summary: String,
    pub has_pending_flow: bool,
    pub interaction_count: u64,
    pub user_identified: bool,
}

/// The input most recently handed to an agent
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveTask {
    agent_name: String,
    input: String,
}

/// Mutable state of one conversation
#[derive(Clone)]
pub struct SessionState {
    session_id: String,
    user_id: Option<i64>,
    profile: Option<UserProfile>,
    current_agent_name: Option<String>,
    interaction_count: u64,
    conversation_state: StateMap,
    flow_stack: FlowStack,
    started_at: DateTime<Utc>,
    active_task: Option<ActiveTask>,
    transcript: Conversation,
    summary_chars: usize,
    logger: Arc<dyn ConversationLogger>,
}

impl SessionState {
    /// Create a session that logs conversations through tracing
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingConversationLogger))
    }

    /// Create a session with default bounds and the given conversation logger
    pub fn with_logger(logger: Arc<dyn ConversationLogger>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
            profile: None,
            current_agent_name: None,
            interaction_count: 0,
            conversation_state: StateMap::new(),
            flow_stack: FlowStack::default(),
            started_at: Utc::now(),
            active_task: None,
            transcript: Conversation::default(),
            summary_chars: DEFAULT_SUMMARY_CHARS,
            logger,
        }
    }

    /// Create a session bounded by the given configuration
    pub fn from_config(config: &Config, logger: Arc<dyn ConversationLogger>) -> Self {
        let mut session = Self::with_logger(logger);
        session.flow_stack = FlowStack::new(config.flow.max_depth);
        session.transcript = Conversation::new(config.agent.max_history);
        session.summary_chars = config.router.state_summary_chars;
        session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Set the authenticated user. Allowed once per session.
    pub fn set_user(&mut self, user_id: i64) -> Result<()> {
        match self.user_id {
            Some(existing) => Err(AssistantError::UserAlreadySet(existing)),
            None => {
                debug!(session_id = %self.session_id, user_id, "session user set");
                self.user_id = Some(user_id);
                Ok(())
            }
        }
    }

    /// Profile of the identified user, once the Greeter has looked it up
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Attach the profile of the session's user. Ignored for anyone else.
    pub fn attach_profile(&mut self, profile: UserProfile) {
        if self.user_id == Some(profile.id) {
            self.profile = Some(profile);
        } else {
            warn!(
                session_id = %self.session_id,
                profile_id = profile.id,
                "ignoring profile that does not belong to the session user"
            );
        }
    }

    pub fn current_agent_name(&self) -> Option<&str> {
        self.current_agent_name.as_deref()
    }

    pub fn set_current_agent(&mut self, agent_name: impl Into<String>) {
        self.current_agent_name = Some(agent_name.into());
    }

    pub fn interaction_count(&self) -> u64 {
        self.interaction_count
    }

    pub fn increment_interactions(&mut self) {
        self.interaction_count += 1;
    }

    pub fn conversation_state(&self) -> &StateMap {
        &self.conversation_state
    }

    pub fn conversation_state_mut(&mut self) -> &mut StateMap {
        &mut self.conversation_state
    }

    /// Replace the whole task state
    pub fn replace_conversation_state(&mut self, state: StateMap) {
        self.conversation_state = state;
    }

    pub fn get_state(&self, key: &str) -> Option<&serde_json::Value> {
        self.conversation_state.get(key)
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.conversation_state.insert(key.into(), value);
    }

    pub fn remove_state(&mut self, key: &str) -> Option<serde_json::Value> {
        self.conversation_state.remove(key)
    }

    /// What the active agent says it is working on, if anything
    pub fn current_task(&self) -> Option<String> {
        self.conversation_state
            .get(CURRENT_TASK_KEY)
            .filter(|v| !v.is_null())
            .map(display_value)
    }

    pub fn flow_stack(&self) -> &FlowStack {
        &self.flow_stack
    }

    pub fn flow_stack_mut(&mut self) -> &mut FlowStack {
        &mut self.flow_stack
    }

    pub fn transcript(&self) -> &Conversation {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Conversation {
        &mut self.transcript
    }

    /// Record the input about to be handed to `agent_name`
    pub fn begin_task(&mut self, agent_name: impl Into<String>, input: impl Into<String>) {
        let task = ActiveTask {
            agent_name: agent_name.into(),
            input: input.into(),
        };
        debug!(
            agent = %task.agent_name,
            input = truncate_chars(&task.input, 20),
            "task started"
        );
        self.active_task = Some(task);
    }

    /// Input last handed to `agent_name`, if it is the agent that received it
    pub fn task_input_for(&self, agent_name: &str) -> Option<&str> {
        self.active_task
            .as_ref()
            .filter(|task| task.agent_name == agent_name)
            .map(|task| task.input.as_str())
    }

    /// Forward a turn to the conversation log. Suppressed until a user is
    /// set; logger failures are reported and swallowed.
    pub fn record_turn(&self, role: Role, message: &str, agent_name: Option<&str>) {
        let Some(user_id) = self.user_id else {
            return;
        };

        if message.trim().is_empty() {
            return;
        }

        let agent = agent_name
            .or(self.current_agent_name.as_deref())
            .unwrap_or("Unknown");
        let record = ConversationRecord::new(user_id, &self.session_id, role, message, agent);

        if let Err(e) = self.logger.log(&record) {
            warn!(session_id = %self.session_id, error = %e, "failed to log conversation turn");
        }
    }

    /// Deep copy of the externally visible context
    pub fn snapshot_context(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id,
            session_id: self.session_id.clone(),
            current_agent_name: self.current_agent_name.clone(),
            interaction_count: self.interaction_count,
            conversation_state: self.conversation_state.clone(),
        }
    }

    /// Restore context captured by `snapshot_context`.
    ///
    /// Identity stays set-once: the snapshot's user is adopted only while no
    /// user is set, and a foreign session id is ignored. The interaction
    /// counter never moves backwards.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        if snapshot.session_id != self.session_id {
            warn!(
                session_id = %self.session_id,
                snapshot_session = %snapshot.session_id,
                "ignoring snapshot session id from another session"
            );
        }

        if self.user_id.is_none() {
            self.user_id = snapshot.user_id;
        }

        self.current_agent_name = snapshot.current_agent_name;
        self.interaction_count = self.interaction_count.max(snapshot.interaction_count);
        self.conversation_state = snapshot.conversation_state;
    }

    /// Bundle the router consumes. Reads only.
    pub fn prepare_routing_context(&self) -> RoutingContext {
        RoutingContext {
            current_agent: self.current_agent_name.clone(),
            state_summary: self.summarize_state(),
            flow_stack_summary: self.flow_stack.summarize(),
            has_pending_flow: self.flow_stack.has_pending(),
            interaction_count: self.interaction_count,
            user_identified: self.user_id.is_some(),
        }
    }

    fn summarize_state(&self) -> String {
        let task = self.current_task().unwrap_or_else(|| "N/A".to_string());
        let mut summary = format!("Task: {}", truncate_chars(&task, self.summary_chars));

        let other_keys: Vec<&str> = self
            .conversation_state
            .keys()
            .map(String::as_str)
            .filter(|k| *k != CURRENT_TASK_KEY)
            .collect();

        if !other_keys.is_empty() {
            let keys = other_keys.join(", ");
            summary.push_str("; keys: ");
            summary.push_str(truncate_chars(&keys, self.summary_chars));
        }

        summary
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("current_agent_name", &self.current_agent_name)
            .field("interaction_count", &self.interaction_count)
            .field("conversation_state", &self.conversation_state)
            .field("flow_stack", &self.flow_stack.summarize())
            .finish_non_exhaustive()
    }
}
