//! Flow module - suspended conversation flows
//!
//! The per-session stack of interrupted flows and the resolver that turns
//! a routing decision into the agent that actually runs.

pub mod resolver;
pub mod stack;

pub use resolver::{FlowResolver, Resolution};
pub use stack::{FlowFrame, FlowStack, PendingInput, DEFAULT_MAX_DEPTH, UNAVAILABLE_INPUT_PLACEHOLDER};
