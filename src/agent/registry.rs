//! Agent registry - maps routed names to handlers
//!
//! Central hub the dispatch loop looks agents up in.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::agent::completion::CompletionAgent;
use crate::agent::directory::{InMemoryUserDirectory, UserDirectory, UserProfile};
use crate::agent::greeter::GreeterAgent;
use crate::agent::handler::AgentHandler;
use crate::agent::health_monitor::HealthMonitorAgent;
use crate::agent::llm_agent::LlmAgent;
use crate::agent::planner::PlannerAgent;
use crate::agent::records::{
    InMemoryMealPlanStore, InMemoryReadingStore, InMemoryWellbeingLog, MealPlanStore, ReadingStore,
    WellbeingLog,
};
use crate::agent::wellbeing::WellbeingAgent;
use crate::agent::{prompts, AgentName};
use crate::core::{Config, Result};
use crate::llm::LLMProvider;

/// Collaborators the default agents read from and write to
#[derive(Clone)]
pub struct AgentServices {
    pub users: Arc<dyn UserDirectory>,
    pub wellbeing: Arc<dyn WellbeingLog>,
    pub readings: Arc<dyn ReadingStore>,
    pub meal_plans: Arc<dyn MealPlanStore>,
}

impl AgentServices {
    /// Everything kept in memory, with `users` as the directory
    pub fn in_memory(users: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: Arc::new(InMemoryUserDirectory::new(users)),
            wellbeing: Arc::new(InMemoryWellbeingLog::new()),
            readings: Arc::new(InMemoryReadingStore::new()),
            meal_plans: Arc::new(InMemoryMealPlanStore::new()),
        }
    }
}

/// Registry of available agents
#[derive(Clone, Default)]
pub struct AgentRegistry {
    /// Handlers indexed by name
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every allow-listed agent
    pub fn with_defaults(
        llm: Arc<dyn LLMProvider>,
        services: &AgentServices,
        config: &Config,
    ) -> Result<Self> {
        let conversational = |name: AgentName, instructions: &str| {
            LlmAgent::builder(name.as_str())
                .instructions(instructions)
                .llm(llm.clone())
                .config(config)
                .build()
        };

        let mut registry = Self::new();
        registry.register(Arc::new(GreeterAgent::new(services.users.clone())));
        registry.register(Arc::new(WellbeingAgent::new(
            conversational(AgentName::WellBeing, prompts::WELLBEING_INSTRUCTIONS)?,
            services.wellbeing.clone(),
        )));
        registry.register(Arc::new(HealthMonitorAgent::new(
            conversational(AgentName::HealthMonitor, prompts::HEALTH_MONITOR_INSTRUCTIONS)?,
            services.readings.clone(),
        )));
        registry.register(Arc::new(PlannerAgent::new(
            conversational(AgentName::Planner, prompts::PLANNER_INSTRUCTIONS)?,
            services.meal_plans.clone(),
            services.readings.clone(),
        )));
        registry.register(Arc::new(conversational(
            AgentName::Affirmation,
            prompts::AFFIRMATION_INSTRUCTIONS,
        )?));
        registry.register(Arc::new(conversational(
            AgentName::GeneralQuery,
            prompts::GENERAL_QUERY_INSTRUCTIONS,
        )?));
        registry.register(Arc::new(CompletionAgent));

        Ok(registry)
    }

    /// Register a handler under its own name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn AgentHandler>) -> Option<Arc<dyn AgentHandler>> {
        let name = handler.name().to_string();
        debug!(agent = %name, "registering agent");
        self.handlers.insert(name, handler)
    }

    /// Look up a handler
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::FALLBACK_AGENT;
    use crate::llm::OllamaClient;

    fn defaults() -> AgentRegistry {
        let llm = Arc::new(OllamaClient::with_base_url("http://localhost:11434").unwrap());
        let services = AgentServices::in_memory(Vec::<UserProfile>::new());
        AgentRegistry::with_defaults(llm, &services, &Config::default()).unwrap()
    }

    #[test]
    fn test_defaults_cover_allow_list() {
        let registry = defaults();
        assert_eq!(registry.len(), AgentName::ALL.len());
        for name in AgentName::ALL {
            let handler = registry.get(name.as_str()).expect("registered");
            assert_eq!(handler.name(), name.as_str());
        }
        assert!(!registry.contains(FALLBACK_AGENT));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = defaults();
        let previous = registry.register(Arc::new(CompletionAgent));
        assert!(previous.is_some());
        assert_eq!(registry.len(), AgentName::ALL.len());
        assert_eq!(registry.names()[0], "Affirmation");
    }
}
