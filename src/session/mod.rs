//! Session module - per-conversation state
//!
//! Identity, active agent, task state, transcript, and the audit log
//! collaborators a session writes to.

pub mod conversation;
pub mod logger;
pub mod state;

pub use conversation::Conversation;
pub use logger::{
    ConversationLogger, ConversationRecord, MemoryConversationLogger, TracingConversationLogger,
};
pub use state::{RoutingContext, SessionSnapshot, SessionState, CURRENT_TASK_KEY};
