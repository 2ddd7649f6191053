//! Agent module - the specialists a turn can be dispatched to
//!
//! Every name the router may choose is an `AgentName`; each one is backed by
//! an `AgentHandler` registered in the `AgentRegistry`.

pub mod completion;
pub mod directory;
pub mod greeter;
pub mod handler;
pub mod health_monitor;
pub mod llm_agent;
pub mod planner;
pub mod prompts;
pub mod records;
pub mod registry;
pub mod wellbeing;

use std::fmt;
use std::str::FromStr;

use crate::core::AssistantError;

pub use completion::CompletionAgent;
pub use directory::{InMemoryUserDirectory, UserDirectory, UserProfile};
pub use greeter::GreeterAgent;
pub use handler::{AgentHandler, AgentReply};
pub use health_monitor::{GlucoseStatus, HealthMonitorAgent};
pub use llm_agent::{LlmAgent, LlmAgentBuilder};
pub use planner::PlannerAgent;
pub use records::{
    InMemoryMealPlanStore, InMemoryReadingStore, InMemoryWellbeingLog, MealPlanStore, ReadingStore,
    WellbeingLog,
};
pub use registry::{AgentRegistry, AgentServices};
pub use wellbeing::WellbeingAgent;

/// Target the router names when it could not route at all. Never registered.
pub const FALLBACK_AGENT: &str = "FallbackAgent";

/// The agents the router may route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentName {
    Greeter,
    WellBeing,
    HealthMonitor,
    Planner,
    Affirmation,
    GeneralQuery,
    Done,
}

impl AgentName {
    pub const ALL: [AgentName; 7] = [
        AgentName::Greeter,
        AgentName::WellBeing,
        AgentName::HealthMonitor,
        AgentName::Planner,
        AgentName::Affirmation,
        AgentName::GeneralQuery,
        AgentName::Done,
    ];

    /// Where unreadable router output sends the user
    pub const SAFE_DEFAULT: AgentName = AgentName::Greeter;

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Greeter => "Greeter",
            AgentName::WellBeing => "WellBeing",
            AgentName::HealthMonitor => "HealthMonitor",
            AgentName::Planner => "Planner",
            AgentName::Affirmation => "Affirmation",
            AgentName::GeneralQuery => "GeneralQuery",
            AgentName::Done => "Done",
        }
    }

    /// Whether `name` is on the allow-list (exact match)
    pub fn is_allowed(name: &str) -> bool {
        name.parse::<AgentName>().is_ok()
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| AssistantError::UnknownAgent(s.to_string()))
    }
}
