//! Conversation log collaborators
//!
//! Audit records of what was said in a session. Storage is someone else's
//! job; the session only needs something that accepts a record and may
//! fail. Two implementations ship: one that emits records as tracing events
//! on the `conversation` target, and one that keeps them in memory.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{truncate_chars, AssistantError, Result, Role};

/// Longest message stored in a record
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Longest agent name stored in a record
pub const MAX_AGENT_NAME_CHARS: usize = 50;

/// One logged conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub user_id: i64,
    pub session_id: String,
    pub role: Role,
    pub message: String,
    pub agent_name: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationRecord {
    /// Build a record, trimming and truncating the free-text fields
    pub fn new(
        user_id: i64,
        session_id: impl Into<String>,
        role: Role,
        message: &str,
        agent_name: &str,
    ) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
            role,
            message: truncate_chars(message.trim(), MAX_MESSAGE_CHARS).to_string(),
            agent_name: truncate_chars(agent_name.trim(), MAX_AGENT_NAME_CHARS).to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for conversation records
pub trait ConversationLogger: Send + Sync {
    /// Persist one record
    fn log(&self, record: &ConversationRecord) -> Result<()>;
}

/// Emits records as `info` events on the `conversation` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConversationLogger;

impl ConversationLogger for TracingConversationLogger {
    fn log(&self, record: &ConversationRecord) -> Result<()> {
        info!(
            target: "conversation",
            user_id = record.user_id,
            session_id = %record.session_id,
            role = %record.role,
            agent = %record.agent_name,
            "{}",
            record.message
        );
        Ok(())
    }
}

/// Keeps records in memory, oldest first
#[derive(Debug, Default)]
pub struct MemoryConversationLogger {
    records: Mutex<Vec<ConversationRecord>>,
}

impl MemoryConversationLogger {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record logged so far
    pub fn records(&self) -> Vec<ConversationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of records logged so far
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConversationLogger for MemoryConversationLogger {
    fn log(&self, record: &ConversationRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| AssistantError::logger("conversation log lock poisoned"))?;
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_truncates_fields() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 10);
        let record = ConversationRecord::new(7, "s-1", Role::User, &long, "  Greeter  ");
        assert_eq!(record.message.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(record.agent_name, "Greeter");
    }

    #[test]
    fn test_memory_logger_keeps_order() {
        let logger = MemoryConversationLogger::new();
        assert!(logger.is_empty());

        logger
            .log(&ConversationRecord::new(1, "s", Role::User, "hi", "Greeter"))
            .unwrap();
        logger
            .log(&ConversationRecord::new(1, "s", Role::Assistant, "hello", "Greeter"))
            .unwrap();

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "hi");
        assert_eq!(records[1].role, Role::Assistant);
    }

    #[test]
    fn test_tracing_logger_accepts_records() {
        let record = ConversationRecord::new(1, "s", Role::System, "Router: ...", "Router");
        assert!(TracingConversationLogger.log(&record).is_ok());
    }
}
