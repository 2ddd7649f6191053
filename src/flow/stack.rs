//! Flow stack
//!
//! LIFO store of conversation flows suspended by an interruption. Each
//! session owns exactly one stack; frames are moved in on push and moved
//! out on pop, never shared.
//!
//! The stack is bounded. When a push would exceed `max_depth` the OLDEST
//! frame is evicted and handed back to the caller, so the most recent
//! interruptions always stay resumable.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::core::StateMap;
use crate::session::SessionSnapshot;

/// Default bound on suspended flows per session
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Token handed to a resumed agent when its in-flight input was never recorded
pub const UNAVAILABLE_INPUT_PLACEHOLDER: &str = "<interrupted_task_input_unavailable>";

/// Input that was in flight for a flow when it got interrupted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInput {
    /// The real input the suspended agent was last working on
    Captured(String),
    /// Nothing was recorded for the suspended agent
    Unavailable,
}

impl PendingInput {
    /// Build from an optional recorded input
    pub fn from_recorded(input: Option<&str>) -> Self {
        match input {
            Some(text) => PendingInput::Captured(text.to_string()),
            None => PendingInput::Unavailable,
        }
    }

    /// Text to hand to the agent when the flow resumes
    pub fn as_agent_input(&self) -> &str {
        match self {
            PendingInput::Captured(text) => text,
            PendingInput::Unavailable => UNAVAILABLE_INPUT_PLACEHOLDER,
        }
    }

    /// Whether the real input was captured
    pub fn is_captured(&self) -> bool {
        matches!(self, PendingInput::Captured(_))
    }
}

/// A suspended flow
#[derive(Debug, Clone)]
pub struct FlowFrame {
    agent_name: String,
    snapshot: SessionSnapshot,
    agent_state: StateMap,
    pending_input: PendingInput,
    suspended_at: DateTime<Utc>,
}

impl FlowFrame {
    /// Capture a flow. `snapshot` and `agent_state` are owned copies, so
    /// later changes to the live session cannot reach into the frame.
    pub fn new(
        agent_name: impl Into<String>,
        snapshot: SessionSnapshot,
        agent_state: StateMap,
        pending_input: PendingInput,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            snapshot,
            agent_state,
            pending_input,
            suspended_at: Utc::now(),
        }
    }

    /// Agent that was active when the flow was suspended
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Session context at suspension time
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// Agent-local state at suspension time
    pub fn agent_state(&self) -> &StateMap {
        &self.agent_state
    }

    /// Input that was being processed when the interruption happened
    pub fn pending_input(&self) -> &PendingInput {
        &self.pending_input
    }

    /// When the flow was suspended
    pub fn suspended_at(&self) -> DateTime<Utc> {
        self.suspended_at
    }

    /// Consume the frame into its parts
    pub fn into_parts(self) -> (String, SessionSnapshot, StateMap, PendingInput) {
        (
            self.agent_name,
            self.snapshot,
            self.agent_state,
            self.pending_input,
        )
    }
}

/// Bounded LIFO of suspended flows
#[derive(Debug, Clone)]
pub struct FlowStack {
    /// Oldest at the front, most recent at the back
    frames: VecDeque<FlowFrame>,
    max_depth: usize,
}

impl FlowStack {
    /// Create a stack holding at most `max_depth` frames (minimum 1)
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Push a frame. Returns the evicted oldest frame when the bound is hit.
    pub fn push(&mut self, frame: FlowFrame) -> Option<FlowFrame> {
        self.frames.push_back(frame);

        if self.frames.len() > self.max_depth {
            self.frames.pop_front()
        } else {
            None
        }
    }

    /// Remove and return the most recently pushed frame
    pub fn pop(&mut self) -> Option<FlowFrame> {
        self.frames.pop_back()
    }

    /// Look at the most recently pushed frame
    pub fn peek(&self) -> Option<&FlowFrame> {
        self.frames.back()
    }

    /// Whether any flow is waiting to be resumed
    pub fn has_pending(&self) -> bool {
        !self.frames.is_empty()
    }

    /// One-line digest for the router prompt. Not meant to be parsed.
    pub fn summarize(&self) -> String {
        match self.peek() {
            None => "Empty".to_string(),
            Some(top) => format!(
                "Pending: {} flow(s), top: {}",
                self.frames.len(),
                top.agent_name()
            ),
        }
    }

    /// Frames from most recent to oldest
    pub fn iter(&self) -> impl Iterator<Item = &FlowFrame> {
        self.frames.iter().rev()
    }

    /// Number of suspended flows
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Configured bound
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop every suspended flow
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for FlowStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
