//! Router prompt
//!
//! The router sees the user's latest message plus every `RoutingContext`
//! field, rendered into its system prompt.

use crate::core::Message;
use crate::session::RoutingContext;

/// Fixed instructions for the routing model
pub const ROUTER_INSTRUCTIONS: &str = r#"You are the router of a health assistant. Decide which specialist agent should handle the user's latest message.

## Agents
- Greeter: collects the user's ID at the start of a session. Do NOT route here when the user is already identified, unless they explicitly ask to change their ID.
- HealthMonitor: logs and interprets health readings such as CGM glucose values.
- Planner: meal plans, schedules and health goals.
- WellBeing: stress, anxiety, mindfulness and emotional support.
- Affirmation: encouragement and positive statements.
- GeneralQuery: general health and wellness questions. Use it when nothing else clearly fits.
- Done: the user wants to end the conversation.

## Flows
- If the message continues what the current agent is doing, use intent "continue_flow" and keep the current agent.
- If the message is an unrelated aside while a task is in progress, set "is_interruption" to true. Set "should_resume_after" to true when the unfinished task should be picked up again afterwards.
- If a flow is pending and the user wants to go back to it, use intent "resume_flow" exactly, with no topic suffix.
- Otherwise use intent "new_flow". You may add a short topic suffix, e.g. "new_flow_greeting" or "continue_flow_meal_plan".

## Output
Respond with ONE JSON object and nothing else:
{"intent": "...", "target_agent": "...", "is_interruption": false, "should_resume_after": false, "confidence": 0.0, "reason": "..."}
"confidence" is a number between 0 and 1."#;

/// Render the routing context as a prompt section
pub fn render_context(context: &RoutingContext) -> String {
    format!(
        "## Session context\n\
         - current_agent: {}\n\
         - current_state: {}\n\
         - flow_stack: {}\n\
         - has_pending_flow: {}\n\
         - interaction_count: {}\n\
         - user_identified: {}",
        context.current_agent.as_deref().unwrap_or("None"),
        context.state_summary,
        context.flow_stack_summary,
        context.has_pending_flow,
        context.interaction_count,
        context.user_identified,
    )
}

/// Chat messages for one routing call
pub fn build_messages(user_input: &str, context: &RoutingContext) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{}\n\n{}",
            ROUTER_INSTRUCTIONS,
            render_context(context)
        )),
        Message::user(user_input),
    ]
}
