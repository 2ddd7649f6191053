//! Health Assistant - multi-agent wellness assistant
//!
//! Main entry point for the CLI application.

use clap::Parser;
use health_assistant::{Config, Repl};
use tracing_subscriber::EnvFilter;

/// Health Assistant - multi-agent wellness assistant
#[derive(Parser, Debug)]
#[command(name = "health-assistant")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model used to route each message
    #[arg(long, short = 'r')]
    router_model: Option<String>,

    /// Model used by the conversational agents
    #[arg(long, short = 'a')]
    agent_model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

fn init_tracing(config: &Config) {
    let filter = if config.agent.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.router_model {
        config.models.router = model.clone();
    }

    if let Some(ref model) = args.agent_model {
        config.models.agents = model.clone();
    }

    if args.debug {
        config.agent.debug = true;
    }

    init_tracing(&config);

    let mut repl = Repl::with_config(config)?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let response = repl.ask(&prompt).await?;
        println!("{}", response);
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}
