//! Interactive REPL for the health assistant
//!
//! Provides the main user interaction loop.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::AgentServices;
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};
use crate::dispatch::Assistant;
use crate::llm::{LLMProvider, OllamaClient};
use crate::session::{ConversationLogger, SessionState, TracingConversationLogger};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    assistant: Assistant,
    session: SessionState,
    logger: Arc<dyn ConversationLogger>,
}

impl Repl {
    /// Create a REPL with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load())
    }

    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let llm: Arc<dyn LLMProvider> = Arc::new(OllamaClient::from_config(&config)?);
        let services = AgentServices::in_memory(config.users.clone());
        let assistant = Assistant::from_config(llm, services, &config)?;

        let logger: Arc<dyn ConversationLogger> = Arc::new(TracingConversationLogger);
        let session = SessionState::from_config(&config, logger.clone());

        Ok(Self {
            config,
            assistant,
            session,
            logger,
        })
    }

    /// Answer a single prompt in a fresh session (non-interactive mode)
    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        self.assistant.initialize().await?;
        self.assistant.start_session(&mut self.session).await;
        let outcome = self.assistant.process_turn(&mut self.session, prompt).await;
        Ok(outcome.response)
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Connecting to Ollama...");
        io::stdout().flush()?;

        match self.assistant.initialize().await {
            Ok(()) => println!(" Ready!\n"),
            Err(e) => {
                println!("\n\nInitialization error: {}\n", e);
                return Ok(());
            }
        }

        self.greet().await;

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            match handle_command(&input, &self.session, &self.config) {
                CommandResult::Exit => {
                    println!("\nGoodbye! Take care.");
                    break;
                }
                CommandResult::Reset => {
                    self.session = SessionState::from_config(&self.config, self.logger.clone());
                    println!("Started a new session.\n");
                    self.greet().await;
                }
                CommandResult::SaveConfig => match self.config.save() {
                    Ok(path) => println!("Configuration saved to {}\n", path.display()),
                    Err(e) => println!("Could not save configuration: {}\n", e),
                },
                CommandResult::Handled(output) => println!("{}\n", output),
                CommandResult::None => {}
                CommandResult::Continue(input) => {
                    let outcome = self.assistant.process_turn(&mut self.session, &input).await;
                    println!("\nAssistant: {}\n", outcome.response);
                }
            }
        }

        Ok(())
    }

    async fn greet(&mut self) {
        let outcome = self.assistant.start_session(&mut self.session).await;
        println!("Assistant: {}\n", outcome.response);
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!(
            r#"
+-----------------------------------------------------------+
|                                                           |
|   Health Assistant                                        |
|   Multi-agent wellness check-ins, running on Ollama       |
|                                                           |
+-----------------------------------------------------------+
"#
        );
        println!("Ollama:     {}", self.config.ollama_url());
        println!("Models:");
        println!("  Router:   {}", self.config.models.router);
        println!("  Agents:   {}", self.config.models.agents);
        println!();
        println!("Commands: help, status, flows, history, config, reset, exit");
        println!("-------------------------------------------------------------");
    }
}
