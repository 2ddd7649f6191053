//! Dispatch module - runs conversation turns

pub mod orchestrator;

pub use orchestrator::{
    Assistant, TurnOutcome, TurnStatus, HANDLER_FAILURE_REPLY, ROUTER_FAILURE_REPLY,
    UNKNOWN_AGENT_REPLY,
};
