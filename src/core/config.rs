//! Configuration management for the assistant
//!
//! Supports environment variables, config files, and runtime overrides.
//! Models are interchangeable via settings.
//!
//! Config file location: ~/.config/health-assistant/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::UserProfile;
use crate::core::error::{AssistantError, Result};

/// Main configuration for the assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Model configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Router behaviour
    #[serde(default)]
    pub router: RouterConfig,
    /// Flow stack behaviour
    #[serde(default)]
    pub flow: FlowConfig,
    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Known users, seeded into the in-memory user directory
    #[serde(default)]
    pub users: Vec<UserProfile>,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration - interchangeable models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used to classify turns and pick the next agent
    pub router: String,
    /// Model used by the conversational agents
    pub agents: String,
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Upper bound on a single classification call, in seconds
    pub timeout_secs: u64,
    /// Sampling temperature for classification
    pub temperature: f32,
    /// Maximum characters of the current task shown to the router
    pub state_summary_chars: usize,
}

/// Flow stack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Maximum number of suspended flows kept per session
    pub max_depth: usize,
    /// Offer to return to a suspended flow once the interrupting one ends
    pub offer_resume: bool,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum transcript length kept per session
    /// Default: 200
    pub max_history: usize,
    /// Number of recent transcript messages handed to LLM agents
    /// Default: 12
    pub context_window: usize,
    /// Sampling temperature for agent replies
    pub temperature: f32,
    /// Whether to show debug output
    pub debug: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is not set
    pub level: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 60,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            router: env::var("HEALTH_ASSISTANT_ROUTER_MODEL")
                .unwrap_or_else(|_| "qwen2.5:7b".to_string()),
            agents: env::var("HEALTH_ASSISTANT_AGENT_MODEL")
                .unwrap_or_else(|_| "llama3.1:8b".to_string()),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            temperature: 0.1,
            state_summary_chars: 50,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            offer_resume: true,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_history: 200,
            context_window: 12,
            temperature: 0.7,
            debug: env::var("HEALTH_ASSISTANT_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("HEALTH_ASSISTANT_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl RouterConfig {
    /// Classification timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("health-assistant")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(mut config) => {
                config.apply_overrides(|key| env::var(key).ok());
                config
            }
            // Defaults already read the environment
            Err(_) => Self::default(),
        }
    }

    /// Overwrite file settings with any variable `lookup` knows about
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(port) = lookup("OLLAMA_PORT").and_then(|p| p.parse().ok()) {
            self.ollama.port = port;
        }
        if let Some(model) = lookup("HEALTH_ASSISTANT_ROUTER_MODEL") {
            self.models.router = model;
        }
        if let Some(model) = lookup("HEALTH_ASSISTANT_AGENT_MODEL") {
            self.models.agents = model;
        }
        if let Some(debug) = lookup("HEALTH_ASSISTANT_DEBUG") {
            self.agent.debug = debug == "true" || debug == "1";
        }
        if let Some(level) = lookup("HEALTH_ASSISTANT_LOG") {
            self.logging.level = level;
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(AssistantError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AssistantError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections use defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AssistantError::config(format!("Failed to parse config: {}", e)))?;

        if config.flow.max_depth == 0 {
            return Err(AssistantError::config("flow.max_depth must be at least 1"));
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|e| {
                AssistantError::config(format!("Failed to create config dir: {}", e))
            })?;
        }

        let content = self.to_toml()?;

        fs::write(&config_path, content)
            .map_err(|e| AssistantError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AssistantError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
