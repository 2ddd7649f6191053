//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::core::{truncate_chars, Config, Role};
use crate::flow::PendingInput;
use crate::session::SessionState;

/// Messages shown by `history`
const HISTORY_LINES: usize = 10;

/// Result of parsing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Start a fresh session
    Reset,
    /// Write the active configuration to the config file
    SaveConfig,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, session: &SessionState, config: &Config) -> CommandResult {
    let input = input.trim();
    if input.is_empty() {
        return CommandResult::None;
    }

    let cmd = input.to_lowercase();
    match cmd.as_str() {
        "exit" | "quit" | "bye" => CommandResult::Exit,

        "reset" => CommandResult::Reset,

        "help" | "?" => CommandResult::Handled(help_text()),

        "status" => CommandResult::Handled(status_text(session)),

        "flows" => CommandResult::Handled(flows_text(session)),

        "history" => CommandResult::Handled(history_text(session)),

        "config" => CommandResult::Handled(config_text(config)),

        "config defaults" => CommandResult::Handled(Config::default_config_toml()),

        "config save" => CommandResult::SaveConfig,

        _ => CommandResult::Continue(input.to_string()),
    }
}

fn status_text(session: &SessionState) -> String {
    let user = match (session.user_id(), session.profile()) {
        (Some(id), Some(profile)) => format!("{} ({})", id, profile.first_name),
        (Some(id), None) => id.to_string(),
        (None, _) => "not identified".to_string(),
    };

    format!(
        "Session Status:\n\
         ─────────────────────────────\n\
         Session:      {}\n\
         Started:      {}\n\
         User:         {}\n\
         Agent:        {}\n\
         Interactions: {}\n\
         Flows:        {}",
        session.session_id(),
        session.started_at().format("%Y-%m-%d %H:%M:%S UTC"),
        user,
        session.current_agent_name().unwrap_or("none"),
        session.interaction_count(),
        session.flow_stack().summarize()
    )
}

fn config_text(config: &Config) -> String {
    match config.to_toml() {
        Ok(body) => format!("# {}\n{}", Config::config_file().display(), body.trim_end()),
        Err(e) => format!("Could not render configuration: {}", e),
    }
}

fn flows_text(session: &SessionState) -> String {
    let stack = session.flow_stack();
    if stack.is_empty() {
        return "No suspended flows.".to_string();
    }

    let mut output = format!("Suspended flows ({}/{}), most recent first:\n", stack.len(), stack.max_depth());
    for (i, frame) in stack.iter().enumerate() {
        let input = match frame.pending_input() {
            PendingInput::Captured(text) => format!("\"{}\"", truncate_chars(text, 40)),
            PendingInput::Unavailable => "(input not recorded)".to_string(),
        };
        output.push_str(&format!(
            "  {}. {} since {}, pending {}\n",
            i + 1,
            frame.agent_name(),
            frame.suspended_at().format("%H:%M:%S"),
            input
        ));
    }
    output.trim_end().to_string()
}

fn history_text(session: &SessionState) -> String {
    let messages = session.transcript().last_n(HISTORY_LINES);
    if messages.is_empty() {
        return "No messages yet.".to_string();
    }

    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "You",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate help text
fn help_text() -> String {
    r#"Health Assistant Commands:
─────────────────────────────────────────────
  help, ?            Show this help message
  exit, quit, bye    End the session
  status             Show session details
  flows              List suspended conversation flows
  history            Show recent messages
  reset              Start a new session
  config             Show the active configuration
  config defaults    Show the default configuration
  config save        Save the active configuration

Keyboard Shortcuts:
  Ctrl+D             End the session

Anything else is sent to the assistant.
─────────────────────────────────────────────"#
        .to_string()
}
