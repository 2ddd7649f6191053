//! Health monitor agent
//!
//! Pulls a CGM glucose reading out of the user's message, classifies it, and
//! lets the LLM agent phrase the response. Valid readings from identified
//! users go to the reading store. The task state it leaves behind is what
//! the router sees and what a resumed flow restores.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Timelike, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::agent::handler::{AgentHandler, AgentReply};
use crate::agent::llm_agent::{signals_handoff, LlmAgent};
use crate::agent::records::{GlucoseReading, MealSlot, ReadingStore, MAX_READING, MIN_READING};
use crate::agent::AgentName;
use crate::core::{number_tokens, Result};
use crate::flow::UNAVAILABLE_INPUT_PLACEHOLDER;
use crate::session::{SessionState, CURRENT_TASK_KEY};

/// Task recorded while the agent waits for a reading
pub const AWAITING_READING_TASK: &str = "awaiting_cgm_reading";
/// State key holding the most recent valid reading
pub const LAST_READING_KEY: &str = "last_reading";

const STATS_DAYS: i64 = 7;

/// Classification of a glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseStatus {
    DangerouslyLow,
    Low,
    Normal,
    Elevated,
    DangerouslyHigh,
}

impl GlucoseStatus {
    pub fn classify(mg_dl: f64) -> Self {
        if mg_dl < 50.0 {
            GlucoseStatus::DangerouslyLow
        } else if mg_dl < 70.0 {
            GlucoseStatus::Low
        } else if mg_dl <= 140.0 {
            GlucoseStatus::Normal
        } else if mg_dl <= 250.0 {
            GlucoseStatus::Elevated
        } else {
            GlucoseStatus::DangerouslyHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GlucoseStatus::DangerouslyLow => "dangerously_low",
            GlucoseStatus::Low => "low",
            GlucoseStatus::Normal => "normal",
            GlucoseStatus::Elevated => "elevated",
            GlucoseStatus::DangerouslyHigh => "dangerously_high",
        }
    }

    /// Readings that always warrant medical attention
    pub fn is_dangerous(&self) -> bool {
        matches!(
            self,
            GlucoseStatus::DangerouslyLow | GlucoseStatus::DangerouslyHigh
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Valid(f64),
    OutOfRange(f64),
    Missing,
}

/// First in-range number in `text`, else the first number at all
fn extract_reading(text: &str) -> Reading {
    let numbers: Vec<f64> = number_tokens(text)
        .into_iter()
        .filter_map(|token| token.parse::<f64>().ok())
        .collect();

    if let Some(valid) = numbers
        .iter()
        .copied()
        .find(|n| (MIN_READING..=MAX_READING).contains(n))
    {
        return Reading::Valid(valid);
    }

    numbers
        .first()
        .copied()
        .map_or(Reading::Missing, Reading::OutOfRange)
}

/// Logs glucose readings
#[derive(Clone)]
pub struct HealthMonitorAgent {
    llm: LlmAgent,
    readings: Arc<dyn ReadingStore>,
}

impl HealthMonitorAgent {
    pub fn new(llm: LlmAgent, readings: Arc<dyn ReadingStore>) -> Self {
        Self { llm, readings }
    }

    /// Store the reading and summarize the week. Failures only cost the note.
    async fn store_reading(&self, user_id: i64, value: f64, text: &str) -> Option<String> {
        let reading = GlucoseReading::new(value).ok()?;
        let slot = MealSlot::mentioned_in(text)
            .unwrap_or_else(|| MealSlot::for_hour(Local::now().hour()));

        if let Err(e) = self.readings.log_reading(user_id, reading, slot).await {
            warn!(user_id, error = %e, "could not store glucose reading");
            return Some("[The reading could not be saved]".to_string());
        }

        match self.readings.reading_statistics(user_id, STATS_DAYS).await {
            Ok(stats) => Some(format!(
                "[Saved as {} reading. Last {} days: {}]",
                slot,
                stats.days,
                stats.summary()
            )),
            Err(e) => {
                warn!(user_id, error = %e, "could not read glucose statistics");
                Some(format!("[Saved as {} reading]", slot))
            }
        }
    }
}

#[async_trait]
impl AgentHandler for HealthMonitorAgent {
    fn name(&self) -> &str {
        AgentName::HealthMonitor.as_str()
    }

    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply> {
        let user_text = if input == UNAVAILABLE_INPUT_PLACEHOLDER {
            "I'm back to log my glucose reading."
        } else {
            input
        };

        let prompt = match extract_reading(user_text) {
            Reading::Valid(value) => {
                let status = GlucoseStatus::classify(value);
                session.remove_state(CURRENT_TASK_KEY);
                session.set_state(
                    LAST_READING_KEY,
                    json!({
                        "value": value,
                        "unit": "mg/dL",
                        "status": status.as_str(),
                        "recorded_at": Utc::now().to_rfc3339(),
                    }),
                );

                if status.is_dangerous() {
                    warn!(value, status = status.as_str(), "dangerous glucose reading");
                } else {
                    info!(value, status = status.as_str(), "glucose reading logged");
                }

                let mut prompt = format!(
                    "{}\n\n[Reading logged: {} mg/dL, status: {}{}]",
                    user_text,
                    value,
                    status.as_str(),
                    if status.is_dangerous() {
                        ", advise medical attention"
                    } else {
                        ""
                    }
                );
                if let Some(user_id) = session.user_id() {
                    if let Some(note) = self.store_reading(user_id, value, user_text).await {
                        prompt.push('\n');
                        prompt.push_str(&note);
                    }
                }
                prompt
            }
            Reading::OutOfRange(value) => {
                session.set_state(CURRENT_TASK_KEY, json!(AWAITING_READING_TASK));
                format!(
                    "{}\n\n[{} is outside the valid {}-{} mg/dL range, ask for a valid reading]",
                    user_text, value, MIN_READING, MAX_READING
                )
            }
            Reading::Missing => {
                session.set_state(CURRENT_TASK_KEY, json!(AWAITING_READING_TASK));
                format!("{}\n\n[No reading yet]", user_text)
            }
        };

        let text = self.llm.reply(&prompt, session).await?;
        let should_continue = !signals_handoff(&text);
        Ok(AgentReply {
            text,
            should_continue,
        })
    }
}
