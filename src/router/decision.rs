//! Routing decisions and the router response parser
//!
//! The router LLM is asked for a JSON object, but nothing guarantees it
//! sends one. `parse_router_response` never fails: a response that cannot
//! be decoded becomes a fully populated fallback decision.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::agent::{AgentName, FALLBACK_AGENT};
use crate::core::{display_value, truncate_chars};

/// Confidence assumed when the router omits one
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
/// Confidence of a decision synthesized from an unreadable response
pub const PARSE_FAILURE_CONFIDENCE: f32 = 0.1;
/// Confidence of a decision synthesized because the router call failed
pub const ROUTER_FAILURE_CONFIDENCE: f32 = 0.0;
/// Longest failure description carried in a fallback reason
pub const MAX_FAILURE_REASON_CHARS: usize = 200;

const NO_REASON: &str = "No reason provided.";

/// Broad kind of a routing intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    NewFlow,
    ContinueFlow,
    InterruptionQuery,
    ResumeFlow,
    /// The router answered but the answer could not be decoded
    ParseError,
    /// The router could not be reached at all
    RouterUnavailable,
}

impl IntentKind {
    const BASE_KINDS: [IntentKind; 4] = [
        IntentKind::NewFlow,
        IntentKind::ContinueFlow,
        IntentKind::InterruptionQuery,
        IntentKind::ResumeFlow,
    ];

    /// Wire tag of the kind
    pub fn tag(&self) -> &'static str {
        match self {
            IntentKind::NewFlow => "new_flow",
            IntentKind::ContinueFlow => "continue_flow",
            IntentKind::InterruptionQuery => "interruption_query",
            IntentKind::ResumeFlow => "resume_flow",
            IntentKind::ParseError => "error_parsing_router_response",
            IntentKind::RouterUnavailable => "error_router_unavailable",
        }
    }
}

/// Routing intent: a kind plus an optional content sub-tag
/// (`new_flow_greeting` is `NewFlow` with detail `greeting`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Intent {
    kind: IntentKind,
    detail: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: IntentKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    /// Parse a tag. Unrecognized tags normalize to `new_flow`.
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_lowercase();

        for kind in [IntentKind::ParseError, IntentKind::RouterUnavailable] {
            if tag == kind.tag() {
                return Self::new(kind);
            }
        }

        for kind in IntentKind::BASE_KINDS {
            let base = kind.tag();
            if tag == base {
                return Self::new(kind);
            }
            if let Some(detail) = tag.strip_prefix(base).and_then(|rest| rest.strip_prefix('_')) {
                if !detail.is_empty() {
                    return Self::with_detail(kind, detail);
                }
            }
        }

        warn!(intent = %raw, "unrecognized router intent, treating as new_flow");
        Self::new(IntentKind::NewFlow)
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Whether the router asked to return to a suspended flow. Only the
    /// bare `resume_flow` tag counts; `resume_flow_<topic>` does not.
    pub fn is_resume(&self) -> bool {
        self.kind == IntentKind::ResumeFlow && self.detail.is_none()
    }

    /// Whether this intent was synthesized because routing failed
    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            IntentKind::ParseError | IntentKind::RouterUnavailable
        )
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::new(IntentKind::NewFlow)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}_{}", self.kind.tag(), detail),
            None => f.write_str(self.kind.tag()),
        }
    }
}

impl Serialize for Intent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The router's structured output for one turn. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub intent: Intent,
    /// Agent identifier as the router sent it; may be outside the allow-list
    pub target_agent: String,
    pub is_interruption: bool,
    pub should_resume_after: bool,
    /// Always within [0.0, 1.0]
    pub confidence: f32,
    /// Audit text only, never used for control flow
    pub reason: String,
}

impl RoutingDecision {
    /// Decision for a response that could not be decoded
    pub fn parse_failure(description: impl AsRef<str>) -> Self {
        Self {
            intent: Intent::new(IntentKind::ParseError),
            target_agent: AgentName::SAFE_DEFAULT.to_string(),
            is_interruption: false,
            should_resume_after: false,
            confidence: PARSE_FAILURE_CONFIDENCE,
            reason: format!(
                "Critical error parsing router JSON response: {}",
                truncate_chars(description.as_ref(), MAX_FAILURE_REASON_CHARS)
            ),
        }
    }

    /// Decision for a router call that failed or timed out
    pub fn router_unavailable(description: impl AsRef<str>) -> Self {
        Self {
            intent: Intent::new(IntentKind::RouterUnavailable),
            target_agent: FALLBACK_AGENT.to_string(),
            is_interruption: false,
            should_resume_after: false,
            confidence: ROUTER_FAILURE_CONFIDENCE,
            reason: format!(
                "Router call failed: {}",
                truncate_chars(description.as_ref(), MAX_FAILURE_REASON_CHARS)
            ),
        }
    }

    /// Whether the router itself failed (as opposed to choosing an agent)
    pub fn is_router_failure(&self) -> bool {
        self.intent.kind() == IntentKind::RouterUnavailable
    }

    /// One-line record for the conversation log
    pub fn audit_line(&self) -> String {
        format!(
            "Router: int='{}', tgt='{}', intr={}, res={}, conf={:.2}. Reason: {}",
            self.intent,
            self.target_agent,
            self.is_interruption,
            self.should_resume_after,
            self.confidence,
            self.reason
        )
    }
}

/// Decode a router response into a validated decision. Never fails.
pub fn parse_router_response(response: &str) -> RoutingDecision {
    match decode(response) {
        Ok(decision) => decision,
        Err(description) => {
            warn!(
                response = truncate_chars(response, 500),
                error = %description,
                "could not parse router response"
            );
            RoutingDecision::parse_failure(description)
        }
    }
}

fn decode(response: &str) -> Result<RoutingDecision, String> {
    let body = strip_code_fence(response.trim());

    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;
    let Value::Object(fields) = value else {
        return Err(format!(
            "router response is not a JSON object: '{}'",
            truncate_chars(body, MAX_FAILURE_REASON_CHARS)
        ));
    };

    let intent = match field(&fields, &["intent"]) {
        Some(Value::String(tag)) => Intent::parse(tag),
        Some(other) => Intent::parse(&display_value(other)),
        None => Intent::default(),
    };

    let target_agent = match field(&fields, &["target_agent", "targetAgent"]) {
        Some(value) => {
            let name = display_value(value);
            let name = name.trim();
            if name.is_empty() {
                AgentName::SAFE_DEFAULT.to_string()
            } else {
                name.to_string()
            }
        }
        None => AgentName::SAFE_DEFAULT.to_string(),
    };

    let is_interruption = coerce_flag(&fields, "is_interruption", "isInterruption");
    let should_resume_after = coerce_flag(&fields, "should_resume_after", "shouldResumeAfter");
    let confidence = coerce_confidence(field(&fields, &["confidence"]))?;

    let reason = match field(&fields, &["reason"]) {
        Some(value) => display_value(value),
        None => NO_REASON.to_string(),
    };

    if !AgentName::is_allowed(&target_agent) {
        // Corrected (if at all) when the dispatcher looks the handler up
        warn!(target_agent = %target_agent, "router returned an agent outside the allow-list");
    }

    let decision = RoutingDecision {
        intent,
        target_agent,
        is_interruption,
        should_resume_after,
        confidence,
        reason,
    };
    debug!(?decision, "parsed router response");
    Ok(decision)
}

/// First present, non-null field among `names`
fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !value.is_null())
}

/// Read a flag field. Unreadable values are logged and count as `false`.
fn coerce_flag(fields: &Map<String, Value>, name: &str, alias: &str) -> bool {
    let value = field(fields, &[name, alias]);
    coerce_bool(value).unwrap_or_else(|| {
        warn!(
            flag = name,
            value = %value.map(|v| v.to_string()).unwrap_or_default(),
            "router flag is not a boolean, using false"
        );
        false
    })
}

fn coerce_bool(value: Option<&Value>) -> Option<bool> {
    match value {
        None => Some(false),
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        Some(_) => None,
    }
}

fn coerce_confidence(value: Option<&Value>) -> Result<f32, String> {
    let raw = match value {
        None => return Ok(DEFAULT_CONFIDENCE),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match raw {
        Some(v) if !v.is_nan() => Ok(v.clamp(0.0, 1.0) as f32),
        _ => Err(format!(
            "confidence {} is not a number",
            value.map(|v| v.to_string()).unwrap_or_default()
        )),
    }
}

/// Strip a surrounding markdown code fence (```json ... ```)
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line
    match inner.find('\n') {
        Some(newline) if !inner[..newline].trim_start().starts_with('{') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_response() {
        let decision = parse_router_response(
            r#"{"intent": "new_flow_greeting", "target_agent": "Greeter",
                "is_interruption": false, "should_resume_after": false,
                "confidence": 0.92, "reason": "User said hello"}"#,
        );

        assert_eq!(decision.intent.kind(), IntentKind::NewFlow);
        assert_eq!(decision.intent.detail(), Some("greeting"));
        assert_eq!(decision.intent.to_string(), "new_flow_greeting");
        assert_eq!(decision.target_agent, "Greeter");
        assert!((decision.confidence - 0.92).abs() < f32::EPSILON);
        assert_eq!(decision.reason, "User said hello");
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let decision = parse_router_response("{}");
        assert_eq!(decision.intent.to_string(), "new_flow");
        assert_eq!(decision.target_agent, "Greeter");
        assert!(!decision.is_interruption);
        assert!(!decision.should_resume_after);
        assert_eq!(decision.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(decision.reason, NO_REASON);
    }

    #[test]
    fn test_confidence_is_clamped() {
        for (raw, expected) in [("1.7", 1.0), ("-3", 0.0), ("\"0.25\"", 0.25), ("1e9", 1.0)] {
            let decision =
                parse_router_response(&format!(r#"{{"target_agent": "Planner", "confidence": {}}}"#, raw));
            assert_eq!(decision.confidence, expected, "confidence {}", raw);
            assert!((0.0..=1.0).contains(&decision.confidence));
        }
    }

    #[test]
    fn test_malformed_responses_fall_back() {
        for raw in ["not json at all", "", "   ", "[1, 2, 3]", "\"Planner\"", "42", "{\"intent\":"] {
            let decision = parse_router_response(raw);
            assert_eq!(
                decision.intent.to_string(),
                "error_parsing_router_response",
                "input {:?}",
                raw
            );
            assert_eq!(decision.target_agent, "Greeter");
            assert_eq!(decision.confidence, PARSE_FAILURE_CONFIDENCE);
            assert!(!decision.is_interruption);
            assert!(!decision.should_resume_after);
        }
    }

    #[test]
    fn test_non_numeric_confidence_is_parse_failure() {
        let decision = parse_router_response(r#"{"target_agent": "Planner", "confidence": "high"}"#);
        assert_eq!(decision.intent.kind(), IntentKind::ParseError);
        assert!(decision.reason.contains("confidence"));
    }

    #[test]
    fn test_unreadable_flags_default_to_false() {
        for raw in [r#""maybe""#, "[]", r#"{"a": 1}"#] {
            let decision = parse_router_response(&format!(
                r#"{{"intent": "interruption_query", "target_agent": "GeneralQuery",
                    "is_interruption": {raw}, "should_resume_after": {raw}, "confidence": 0.7}}"#
            ));
            assert_eq!(decision.intent.kind(), IntentKind::InterruptionQuery, "flag {}", raw);
            assert_eq!(decision.target_agent, "GeneralQuery");
            assert!(!decision.is_interruption);
            assert!(!decision.should_resume_after);
            assert!((decision.confidence - 0.7).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_one_unreadable_flag_keeps_the_other() {
        let decision = parse_router_response(
            r#"{"target_agent": "GeneralQuery", "is_interruption": true, "should_resume_after": "maybe"}"#,
        );
        assert!(decision.is_interruption);
        assert!(!decision.should_resume_after);
    }

    #[test]
    fn test_failure_reason_is_truncated() {
        let garbage = "x".repeat(5000);
        let decision = parse_router_response(&garbage);
        assert!(decision.reason.chars().count() < 300);
    }

    #[test]
    fn test_unknown_agent_is_kept() {
        let decision = parse_router_response(r#"{"target_agent": "Nutritionist"}"#);
        assert_eq!(decision.target_agent, "Nutritionist");
        assert_eq!(decision.intent.kind(), IntentKind::NewFlow);
    }

    #[test]
    fn test_camel_case_and_string_booleans() {
        let decision = parse_router_response(
            r#"{"intent": "INTERRUPTION_QUERY", "targetAgent": "GeneralQuery",
                "isInterruption": "true", "shouldResumeAfter": true}"#,
        );
        assert_eq!(decision.intent.kind(), IntentKind::InterruptionQuery);
        assert_eq!(decision.target_agent, "GeneralQuery");
        assert!(decision.is_interruption);
        assert!(decision.should_resume_after);
    }

    #[test]
    fn test_code_fenced_json() {
        let decision = parse_router_response(
            "```json\n{\"intent\": \"resume_flow\", \"target_agent\": \"HealthMonitor\"}\n```",
        );
        assert!(decision.intent.is_resume());
        assert_eq!(decision.target_agent, "HealthMonitor");
    }

    #[test]
    fn test_intent_normalization() {
        assert_eq!(Intent::parse("resume_flow").kind(), IntentKind::ResumeFlow);
        assert_eq!(Intent::parse(" Continue_Flow_meal_plan ").detail(), Some("meal_plan"));
        assert_eq!(Intent::parse("banana").to_string(), "new_flow");
        assert_eq!(Intent::parse("new_flow_").to_string(), "new_flow");
        assert!(Intent::parse("error_router_unavailable").is_error());
    }

    #[test]
    fn test_only_bare_resume_tag_resumes() {
        assert!(Intent::parse("resume_flow").is_resume());
        assert!(Intent::parse(" RESUME_FLOW ").is_resume());

        let with_topic = Intent::parse("resume_flow_reading");
        assert_eq!(with_topic.kind(), IntentKind::ResumeFlow);
        assert!(!with_topic.is_resume());
    }

    #[test]
    fn test_router_unavailable_decision() {
        let decision = RoutingDecision::router_unavailable("timed out");
        assert!(decision.is_router_failure());
        assert_eq!(decision.target_agent, FALLBACK_AGENT);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn test_audit_line() {
        let decision = parse_router_response(
            r#"{"intent": "resume_flow", "target_agent": "HealthMonitor", "confidence": 0.8, "reason": "back"}"#,
        );
        assert_eq!(
            decision.audit_line(),
            "Router: int='resume_flow', tgt='HealthMonitor', intr=false, res=false, conf=0.80. Reason: back"
        );
    }

    #[test]
    fn test_decision_serializes_intent_as_tag() {
        let decision = RoutingDecision::parse_failure("bad");
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["intent"], "error_parsing_router_response");
    }
}
