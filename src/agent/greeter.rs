//! Greeter agent
//!
//! Identifies the user. This is the only place a session's user gets set.

use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::agent::directory::UserDirectory;
use crate::agent::handler::{AgentHandler, AgentReply};
use crate::agent::AgentName;
use crate::core::{number_tokens, Result};
use crate::session::SessionState;

/// Accepted user ids
pub const USER_ID_RANGE: RangeInclusive<i64> = 1..=999_999;

const ASK_FOR_ID: &str =
    "Hello! I'm your health assistant. To get started, please enter your user ID.";

/// Asks for, validates and looks up the user's id
#[derive(Clone)]
pub struct GreeterAgent {
    directory: Arc<dyn UserDirectory>,
}

impl GreeterAgent {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

/// First integer token in `input`, if any
fn parse_user_id(input: &str) -> Option<i64> {
    number_tokens(input)
        .into_iter()
        .find_map(|token| token.parse::<i64>().ok())
}

#[async_trait]
impl AgentHandler for GreeterAgent {
    fn name(&self) -> &str {
        AgentName::Greeter.as_str()
    }

    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply> {
        if session.user_id().is_some() {
            let name = session
                .profile()
                .map(|p| format!(", {}", p.first_name))
                .unwrap_or_default();
            return Ok(AgentReply::finished(format!(
                "Welcome back{}! What would you like to do next?",
                name
            )));
        }

        let input = input.trim();
        if input.is_empty() {
            return Ok(AgentReply::continuing(ASK_FOR_ID));
        }

        let Some(user_id) = parse_user_id(input).filter(|id| USER_ID_RANGE.contains(id)) else {
            debug!("greeter received input without a valid user id");
            return Ok(AgentReply::continuing(format!(
                "That doesn't look like a valid user ID. Please enter a number between {} and {}.",
                USER_ID_RANGE.start(),
                USER_ID_RANGE.end()
            )));
        };

        let Some(profile) = self.directory.fetch_user(user_id).await? else {
            info!(user_id, "unknown user id");
            return Ok(AgentReply::continuing(format!(
                "I couldn't find user ID {}. Please check it and try again.",
                user_id
            )));
        };

        session.set_user(user_id)?;
        let first_name = profile.first_name.clone();
        session.attach_profile(profile);
        info!(user_id, session_id = session.session_id(), "user identified");

        Ok(AgentReply::finished(format!(
            "Hi {}! Great to see you. Let's start with a quick check-in.",
            first_name
        )))
    }
}
