//! WellBeing agent
//!
//! Checks in on how the user feels. A score the user gives is logged once
//! they are identified, and the last week's averages go to the model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::agent::handler::{AgentHandler, AgentReply};
use crate::agent::llm_agent::{signals_handoff, with_notes, LlmAgent};
use crate::agent::records::{
    WellbeingKind, WellbeingLog, WellbeingScore, MAX_WELLBEING_SCORE, MIN_WELLBEING_SCORE,
};
use crate::agent::AgentName;
use crate::core::{number_tokens, Result};
use crate::session::SessionState;

/// State key holding the most recent logged score
pub const LAST_WELLBEING_KEY: &str = "last_wellbeing";

const HISTORY_DAYS: i64 = 7;

/// What the user is scoring. Mood unless something else is named.
fn kind_mentioned(text: &str) -> WellbeingKind {
    let lower = text.to_lowercase();
    if lower.contains("sleep") {
        WellbeingKind::SleepQuality
    } else if lower.contains("stress") || lower.contains("anxious") {
        WellbeingKind::Stress
    } else if lower.contains("energy") || lower.contains("tired") {
        WellbeingKind::Energy
    } else {
        WellbeingKind::Mood
    }
}

/// First whole number in `text`
fn score_mentioned(text: &str) -> Option<i64> {
    number_tokens(text)
        .into_iter()
        .find_map(|token| token.parse::<i64>().ok())
}

#[derive(Clone)]
pub struct WellbeingAgent {
    llm: LlmAgent,
    log: Arc<dyn WellbeingLog>,
}

impl WellbeingAgent {
    pub fn new(llm: LlmAgent, log: Arc<dyn WellbeingLog>) -> Self {
        Self { llm, log }
    }

    async fn record_score(&self, user_id: i64, input: &str, session: &mut SessionState) -> Option<String> {
        let raw = score_mentioned(input)?;
        let kind = kind_mentioned(input);

        let Ok(score) = WellbeingScore::new(raw) else {
            return Some(format!(
                "[{} is not a score between {} and {}, ask again]",
                raw, MIN_WELLBEING_SCORE, MAX_WELLBEING_SCORE
            ));
        };

        match self.log.log_wellbeing(user_id, score, kind).await {
            Ok(entry) => {
                info!(user_id, kind = %kind, score = score.value(), "wellbeing score logged");
                session.set_state(
                    LAST_WELLBEING_KEY,
                    json!({
                        "kind": kind.as_str(),
                        "score": score.value(),
                        "recorded_at": entry.recorded_at.to_rfc3339(),
                    }),
                );
                Some(format!("[Logged {} score {}/10]", kind, score.value()))
            }
            Err(e) => {
                warn!(user_id, error = %e, "could not log wellbeing score");
                Some("[The score could not be saved]".to_string())
            }
        }
    }
}

#[async_trait]
impl AgentHandler for WellbeingAgent {
    fn name(&self) -> &str {
        AgentName::WellBeing.as_str()
    }

    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply> {
        let mut notes = Vec::new();

        if let Some(user_id) = session.user_id() {
            if let Some(note) = self.record_score(user_id, input, session).await {
                notes.push(note);
            }

            match self.log.wellbeing_history(user_id, HISTORY_DAYS).await {
                Ok(history) if history.total() > 0 => {
                    notes.push(format!("[Last {} days: {}]", history.days, history.summary()));
                }
                Ok(_) => {}
                Err(e) => warn!(user_id, error = %e, "could not read wellbeing history"),
            }
        }

        let text = self.llm.reply(&with_notes(input, &notes), session).await?;
        let should_continue = !signals_handoff(&text);
        Ok(AgentReply {
            text,
            should_continue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::records::{InMemoryWellbeingLog, WellbeingEntry, WellbeingHistory};
    use crate::core::{AssistantError, Message};
    use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
    use std::sync::Mutex;

    struct CannedLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for CannedLlm {
        async fn chat(
            &self,
            model: &str,
            messages: &[Message],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok(LLMResponse::text(model, "Thanks for sharing."))
        }

        async fn is_model_available(&self, _model: &str) -> Result<bool> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl WellbeingLog for BrokenLog {
        async fn log_wellbeing(
            &self,
            _user_id: i64,
            _score: WellbeingScore,
            _kind: WellbeingKind,
        ) -> Result<WellbeingEntry> {
            Err(AssistantError::storage("disk full"))
        }

        async fn wellbeing_history(&self, _user_id: i64, _days: i64) -> Result<WellbeingHistory> {
            Err(AssistantError::storage("disk full"))
        }
    }

    fn agent(log: Arc<dyn WellbeingLog>) -> (WellbeingAgent, Arc<CannedLlm>) {
        let llm = Arc::new(CannedLlm {
            prompts: Mutex::new(Vec::new()),
        });
        let inner = LlmAgent::builder("WellBeing").llm(llm.clone()).build().unwrap();
        (WellbeingAgent::new(inner, log), llm)
    }

    fn identified() -> SessionState {
        let mut session = SessionState::new();
        session.set_user(42).unwrap();
        session
    }

    #[test]
    fn test_kind_and_score_extraction() {
        assert_eq!(kind_mentioned("slept badly, 3"), WellbeingKind::SleepQuality);
        assert_eq!(kind_mentioned("so stressed"), WellbeingKind::Stress);
        assert_eq!(kind_mentioned("pretty tired"), WellbeingKind::Energy);
        assert_eq!(kind_mentioned("feeling good"), WellbeingKind::Mood);
        assert_eq!(score_mentioned("about 7/10"), Some(7));
        assert_eq!(score_mentioned("fine thanks"), None);
    }

    #[tokio::test]
    async fn test_score_is_logged_for_identified_user() {
        let log = Arc::new(InMemoryWellbeingLog::new());
        let (agent, llm) = agent(log.clone());
        let mut session = identified();

        agent.handle("stress is at 8 today", &mut session).await.unwrap();

        let history = log.wellbeing_history(42, 7).await.unwrap();
        assert_eq!(history.total(), 1);
        assert_eq!(history.entries[0].kind, WellbeingKind::Stress);
        assert_eq!(session.get_state(LAST_WELLBEING_KEY).unwrap()["score"], json!(8));

        let prompt = llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("[Logged stress score 8/10]"));
        assert!(prompt.contains("[Last 7 days: stress 8.0]"));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_not_logged() {
        let log = Arc::new(InMemoryWellbeingLog::new());
        let (agent, llm) = agent(log.clone());
        let mut session = identified();

        agent.handle("mood is 11", &mut session).await.unwrap();

        assert_eq!(log.wellbeing_history(42, 7).await.unwrap().total(), 0);
        assert!(session.get_state(LAST_WELLBEING_KEY).is_none());
        assert!(llm.prompts.lock().unwrap()[0].contains("11 is not a score between 1 and 10"));
    }

    #[tokio::test]
    async fn test_anonymous_user_is_not_logged() {
        let log = Arc::new(InMemoryWellbeingLog::new());
        let (agent, llm) = agent(log.clone());
        let mut session = SessionState::new();

        agent.handle("mood is 6", &mut session).await.unwrap();

        assert_eq!(log.wellbeing_history(42, 90).await.unwrap().total(), 0);
        assert_eq!(llm.prompts.lock().unwrap()[0], "mood is 6");
    }

    #[tokio::test]
    async fn test_store_failure_still_replies() {
        let (agent, llm) = agent(Arc::new(BrokenLog));
        let mut session = identified();

        let reply = agent.handle("mood is 6", &mut session).await.unwrap();

        assert_eq!(reply.text, "Thanks for sharing.");
        assert!(session.get_state(LAST_WELLBEING_KEY).is_none());
        assert!(llm.prompts.lock().unwrap()[0].contains("[The score could not be saved]"));
    }
}
