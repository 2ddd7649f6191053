//! Meal planner agent
//!
//! The model sees the user's recent glucose statistics and any plan already
//! saved for the target day. The Breakfast, Lunch and Dinner lines of its
//! reply are saved as that day's plan.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{info, warn};

use crate::agent::handler::{AgentHandler, AgentReply};
use crate::agent::llm_agent::{signals_handoff, with_notes, LlmAgent};
use crate::agent::records::{parse_plan_date, MealPlan, MealPlanStore, ReadingStore};
use crate::agent::AgentName;
use crate::core::Result;
use crate::session::SessionState;

/// State key holding the date of the last saved plan
pub const LAST_MEAL_PLAN_KEY: &str = "last_meal_plan";

const STATS_DAYS: i64 = 7;

/// A word that looks like the user meant a date
fn date_mentioned(text: &str) -> Option<&str> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .find(|word| {
            word.chars().filter(char::is_ascii_digit).count() >= 6
                && (word.contains('-') || word.contains('/'))
        })
}

/// Text after a `Label:` line, tolerating markdown bullets and bold
fn meal_line<'a>(reply: &'a str, label: &str) -> Option<&'a str> {
    reply
        .lines()
        .find_map(|line| {
            let cleaned = line.trim().trim_start_matches(['-', '*', ' ']);
            let head = cleaned.get(..label.len())?;
            if !head.eq_ignore_ascii_case(label) {
                return None;
            }
            let rest = cleaned[label.len()..].trim_start_matches('*');
            rest.strip_prefix(':')
                .map(|meal| meal.trim().trim_start_matches('*').trim())
        })
        .filter(|meal| !meal.is_empty())
}

fn plan_from_reply(reply: &str) -> Option<(&str, &str, &str)> {
    Some((
        meal_line(reply, "breakfast")?,
        meal_line(reply, "lunch")?,
        meal_line(reply, "dinner")?,
    ))
}

#[derive(Clone)]
pub struct PlannerAgent {
    llm: LlmAgent,
    plans: Arc<dyn MealPlanStore>,
    readings: Arc<dyn ReadingStore>,
}

impl PlannerAgent {
    pub fn new(llm: LlmAgent, plans: Arc<dyn MealPlanStore>, readings: Arc<dyn ReadingStore>) -> Self {
        Self { llm, plans, readings }
    }

    async fn context_notes(&self, user_id: i64, date: NaiveDate, notes: &mut Vec<String>) {
        match self.readings.reading_statistics(user_id, STATS_DAYS).await {
            Ok(stats) => notes.push(format!("[Glucose: {}]", stats.summary())),
            Err(e) => warn!(user_id, error = %e, "could not read glucose statistics"),
        }

        match self.plans.meal_plan(user_id, date).await {
            Ok(Some(plan)) => notes.push(format!(
                "[Existing plan for {}: breakfast {}; lunch {}; dinner {}]",
                plan.date, plan.breakfast, plan.lunch, plan.dinner
            )),
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "could not read meal plan"),
        }
    }

    async fn save_plan(&self, user_id: i64, date: NaiveDate, reply: &str, session: &mut SessionState) {
        let Some((breakfast, lunch, dinner)) = plan_from_reply(reply) else {
            return;
        };

        let saved = match MealPlan::new(user_id, date, breakfast, lunch, dinner) {
            Ok(plan) => self.plans.save_meal_plan(plan).await,
            Err(e) => Err(e),
        };

        match saved {
            Ok(plan) => {
                info!(
                    user_id,
                    date = %plan.date,
                    updated = plan.updated_at.is_some(),
                    "meal plan saved"
                );
                session.set_state(LAST_MEAL_PLAN_KEY, json!(plan.date.to_string()));
            }
            Err(e) => warn!(user_id, error = %e, "could not save meal plan"),
        }
    }
}

#[async_trait]
impl AgentHandler for PlannerAgent {
    fn name(&self) -> &str {
        AgentName::Planner.as_str()
    }

    async fn handle(&self, input: &str, session: &mut SessionState) -> Result<AgentReply> {
        let today = Local::now().date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);

        let mut notes = Vec::new();
        let date = match date_mentioned(input) {
            Some(raw) => parse_plan_date(Some(raw), tomorrow).unwrap_or_else(|_| {
                notes.push(format!(
                    "[{} is not a YYYY-MM-DD date, planning for {} instead]",
                    raw, tomorrow
                ));
                tomorrow
            }),
            None => tomorrow,
        };
        notes.push(format!("[Plan date: {}]", date));

        let user_id = session.user_id();
        if let Some(user_id) = user_id {
            self.context_notes(user_id, date, &mut notes).await;
        }

        let text = self.llm.reply(&with_notes(input, &notes), session).await?;

        if let Some(user_id) = user_id {
            self.save_plan(user_id, date, &text, session).await;
        }

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
    use crate::agent::records::{GlucoseReading, InMemoryMealPlanStore, InMemoryReadingStore, MealSlot};
    use crate::core::Message;
    use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
    use std::sync::Mutex;

    const PLAN_REPLY: &str = "Based on your vegetarian diet and recent glucose levels, here's the plan:\n\
        **Breakfast**: Oatmeal with berries (1 cup)\n\
        **Lunch**: Lentil salad\n\
        - **Dinner:** Tofu stir-fry with brown rice\n\
        **Tips**: Walk after meals";

    struct CannedLlm {
        reply: &'static str,
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
            Ok(LLMResponse::text(model, self.reply))
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

    struct Fixture {
        agent: PlannerAgent,
        llm: Arc<CannedLlm>,
        plans: Arc<InMemoryMealPlanStore>,
        readings: Arc<InMemoryReadingStore>,
    }

    fn fixture(reply: &'static str) -> Fixture {
        let llm = Arc::new(CannedLlm {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let plans = Arc::new(InMemoryMealPlanStore::new());
        let readings = Arc::new(InMemoryReadingStore::new());
        let inner = LlmAgent::builder("Planner").llm(llm.clone()).build().unwrap();
        Fixture {
            agent: PlannerAgent::new(inner, plans.clone(), readings.clone()),
            llm,
            plans,
            readings,
        }
    }

    fn day(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_plan_lines_are_parsed() {
        assert_eq!(
            plan_from_reply(PLAN_REPLY),
            Some((
                "Oatmeal with berries (1 cup)",
                "Lentil salad",
                "Tofu stir-fry with brown rice"
            ))
        );
        assert_eq!(plan_from_reply("**Breakfast**: eggs\n**Lunch**: soup"), None);
        assert_eq!(plan_from_reply("Breakfast:\nLunch: soup\nDinner: fish"), None);
    }

    #[test]
    fn test_date_mentioned() {
        assert_eq!(date_mentioned("plan for 2026-12-01 please"), Some("2026-12-01"));
        assert_eq!(date_mentioned("for 12/01/2026."), Some("12/01/2026"));
        assert_eq!(date_mentioned("my range is 80-120"), None);
        assert_eq!(date_mentioned("plan tomorrow"), None);
    }

    #[tokio::test]
    async fn test_plan_is_saved_for_requested_date() {
        let f = fixture(PLAN_REPLY);
        f.readings
            .log_reading(42, GlucoseReading::new(130.0).unwrap(), MealSlot::Lunch)
            .await
            .unwrap();
        let mut session = SessionState::new();
        session.set_user(42).unwrap();

        f.agent.handle("plan for 2026-12-01", &mut session).await.unwrap();

        let saved = f.plans.meal_plan(42, day("2026-12-01")).await.unwrap().unwrap();
        assert_eq!(saved.lunch, "Lentil salad");
        assert_eq!(session.get_state(LAST_MEAL_PLAN_KEY), Some(&json!("2026-12-01")));

        let prompt = f.llm.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("[Plan date: 2026-12-01]"));
        assert!(prompt.contains("average 130 mg/dL"));
    }

    #[tokio::test]
    async fn test_existing_plan_is_shown_and_updated() {
        let f = fixture(PLAN_REPLY);
        let date = day("2026-12-01");
        f.plans
            .save_meal_plan(MealPlan::new(42, date, "toast", "soup", "fish").unwrap())
            .await
            .unwrap();
        let mut session = SessionState::new();
        session.set_user(42).unwrap();

        f.agent.handle("redo 2026-12-01", &mut session).await.unwrap();

        assert!(f.llm.prompts.lock().unwrap()[0]
            .contains("[Existing plan for 2026-12-01: breakfast toast; lunch soup; dinner fish]"));
        let saved = f.plans.meal_plan(42, date).await.unwrap().unwrap();
        assert_eq!(saved.breakfast, "Oatmeal with berries (1 cup)");
        assert!(saved.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_bad_date_falls_back_to_tomorrow() {
        let f = fixture("Which diet do you follow?");
        let mut session = SessionState::new();

        let reply = f.agent.handle("plan for 12/01/2026", &mut session).await.unwrap();

        assert!(reply.should_continue);
        assert!(f.llm.prompts.lock().unwrap()[0]
            .contains("12/01/2026 is not a YYYY-MM-DD date"));
        assert!(session.get_state(LAST_MEAL_PLAN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_anonymous_plan_is_not_saved() {
        let f = fixture(PLAN_REPLY);
        let mut session = SessionState::new();

        f.agent.handle("plan for 2026-12-01", &mut session).await.unwrap();

        assert!(f.plans.meal_plan(42, day("2026-12-01")).await.unwrap().is_none());
        assert!(session.get_state(LAST_MEAL_PLAN_KEY).is_none());
    }
}
