//! Handoff policy schema: rule shapes, validation, and normalization.
//!
//! Policies are configuration data mutated by an administrative collaborator;
//! the core only checks and normalizes their shape. Validation collects
//! per-field error paths (`rules[2].criteria.threshold`) so a UI can point at
//! the exact invalid field, and normalization produces the strict typed form
//! the escalation engine consumes.

use crate::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TRIGGER TYPES
// ============================================================================

/// What kind of signal a handoff policy rule reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Agent confidence dropped below a configured threshold
    ConfidenceBelowThreshold,
    /// A policy flag (content category) was detected in the conversation
    PolicyFlagDetected,
    /// A tool invocation failed during the agent run
    ToolError,
    /// The agent itself asked for a human
    AgentRequestedHandoff,
}

impl TriggerType {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TriggerType::ConfidenceBelowThreshold => "confidence_below_threshold",
            TriggerType::PolicyFlagDetected => "policy_flag_detected",
            TriggerType::ToolError => "tool_error",
            TriggerType::AgentRequestedHandoff => "agent_requested_handoff",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, TriggerTypeParseError> {
        match s.to_lowercase().as_str() {
            "confidence_below_threshold" => Ok(TriggerType::ConfidenceBelowThreshold),
            "policy_flag_detected" => Ok(TriggerType::PolicyFlagDetected),
            "tool_error" => Ok(TriggerType::ToolError),
            "agent_requested_handoff" => Ok(TriggerType::AgentRequestedHandoff),
            _ => Err(TriggerTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TriggerType {
    type Err = TriggerTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid trigger type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTypeParseError(pub String);

impl fmt::Display for TriggerTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid trigger type: {}", self.0)
    }
}

impl std::error::Error for TriggerTypeParseError {}

// ============================================================================
// RULE SHAPES
// ============================================================================

/// A rule payload exactly as an administrator submitted it: loosely typed,
/// possibly malformed. Input to [`validate_rules`] and [`normalize_rules`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RawPolicyRule {
    pub trigger_type: String,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub criteria: serde_json::Value,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub priority: Option<serde_json::Value>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub active: Option<serde_json::Value>,
}

/// Trigger-specific criteria in strict, normalized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "trigger_type", content = "criteria", rename_all = "snake_case")]
pub enum RuleCriteria {
    ConfidenceBelowThreshold { threshold: f64 },
    PolicyFlagDetected { flags: Vec<String> },
    ToolError { retryable: bool },
    AgentRequestedHandoff,
}

impl RuleCriteria {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            RuleCriteria::ConfidenceBelowThreshold { .. } => TriggerType::ConfidenceBelowThreshold,
            RuleCriteria::PolicyFlagDetected { .. } => TriggerType::PolicyFlagDetected,
            RuleCriteria::ToolError { .. } => TriggerType::ToolError,
            RuleCriteria::AgentRequestedHandoff => TriggerType::AgentRequestedHandoff,
        }
    }
}

/// A normalized handoff policy rule. Lower `priority` evaluates first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HandoffPolicyRule {
    #[serde(flatten)]
    pub criteria: RuleCriteria,
    pub priority: i32,
    pub active: bool,
}

/// A policy groups rules under a reason code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HandoffPolicy {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub policy_id: EntityId,
    pub reason_code: String,
    pub confidence_threshold: Option<f64>,
    pub rules: Vec<HandoffPolicyRule>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// One field-level validation failure, addressed by path
/// (e.g. `rules[2].criteria.flags[0]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RuleViolation {
    pub index: usize,
    pub path: String,
    pub message: String,
}

impl RuleViolation {
    fn new(index: usize, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            path: path.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a batch of raw rules against the trigger-specific criteria
/// shapes. Rules with unrecognized trigger types are skipped, not failed:
/// an unknown trigger is an administrator-level concern, and failing the
/// whole batch for it would block edits to the recognized rules.
pub fn validate_rules(rules: &[RawPolicyRule]) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        let trigger = match TriggerType::from_db_str(&rule.trigger_type) {
            Ok(t) => t,
            Err(_) => continue,
        };

        let criteria_path = format!("rules[{}].criteria", index);
        match trigger {
            TriggerType::ConfidenceBelowThreshold => {
                let path = format!("{}.threshold", criteria_path);
                match rule.criteria.get("threshold") {
                    Some(value) => match value.as_f64() {
                        Some(threshold) if (0.0..=1.0).contains(&threshold) => {}
                        Some(_) => {
                            violations.push(RuleViolation::new(
                                index,
                                path,
                                "threshold must be within [0, 1]",
                            ));
                        }
                        None => {
                            violations.push(RuleViolation::new(
                                index,
                                path,
                                "threshold must be a number",
                            ));
                        }
                    },
                    None => {
                        violations.push(RuleViolation::new(index, path, "threshold is required"));
                    }
                }
            }
            TriggerType::PolicyFlagDetected => {
                let path = format!("{}.flags", criteria_path);
                match rule.criteria.get("flags") {
                    Some(serde_json::Value::Array(flags)) => {
                        if flags.is_empty() {
                            violations.push(RuleViolation::new(
                                index,
                                path.clone(),
                                "flags must not be empty",
                            ));
                        }
                        for (flag_idx, flag) in flags.iter().enumerate() {
                            match flag.as_str() {
                                Some(s) if !s.trim().is_empty() => {}
                                _ => {
                                    violations.push(RuleViolation::new(
                                        index,
                                        format!("{}[{}]", path, flag_idx),
                                        "flags entries must be non-blank strings",
                                    ));
                                }
                            }
                        }
                    }
                    Some(_) => {
                        violations.push(RuleViolation::new(
                            index,
                            path,
                            "flags must be an array of strings",
                        ));
                    }
                    None => {
                        violations.push(RuleViolation::new(index, path, "flags is required"));
                    }
                }
            }
            TriggerType::ToolError => {
                let path = format!("{}.retryable", criteria_path);
                match rule.criteria.get("retryable") {
                    Some(serde_json::Value::Bool(_)) => {}
                    Some(_) => {
                        violations.push(RuleViolation::new(
                            index,
                            path,
                            "retryable must be a boolean",
                        ));
                    }
                    None => {
                        violations.push(RuleViolation::new(index, path, "retryable is required"));
                    }
                }
            }
            TriggerType::AgentRequestedHandoff => {
                // No required criteria.
            }
        }
    }

    violations
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize raw rules into the strict typed form:
/// - rules with unrecognized trigger types are dropped;
/// - `threshold` rounds to 4 decimal places;
/// - `flags` are lower-cased, slugified, and de-duplicated (first wins);
/// - `retryable` and `active` are coerced to booleans (bool, "true"/"false",
///   0/1 accepted);
/// - missing `priority` defaults to 0, missing `active` to true.
///
/// Rules whose required criteria cannot be coerced at all are dropped too;
/// [`validate_rules`] exists to report them before it comes to that.
pub fn normalize_rules(rules: Vec<RawPolicyRule>) -> Vec<HandoffPolicyRule> {
    rules
        .into_iter()
        .filter_map(|rule| {
            let trigger = TriggerType::from_db_str(&rule.trigger_type).ok()?;

            let criteria = match trigger {
                TriggerType::ConfidenceBelowThreshold => {
                    let threshold = coerce_f64(rule.criteria.get("threshold")?)?;
                    RuleCriteria::ConfidenceBelowThreshold {
                        threshold: round4(threshold),
                    }
                }
                TriggerType::PolicyFlagDetected => {
                    let raw_flags = rule.criteria.get("flags")?.as_array()?;
                    let mut flags: Vec<String> = Vec::with_capacity(raw_flags.len());
                    for flag in raw_flags.iter().filter_map(|f| f.as_str()) {
                        let slug = slugify_flag(flag);
                        if !slug.is_empty() && !flags.contains(&slug) {
                            flags.push(slug);
                        }
                    }
                    if flags.is_empty() {
                        return None;
                    }
                    RuleCriteria::PolicyFlagDetected { flags }
                }
                TriggerType::ToolError => RuleCriteria::ToolError {
                    retryable: rule
                        .criteria
                        .get("retryable")
                        .and_then(coerce_bool)
                        .unwrap_or(false),
                },
                TriggerType::AgentRequestedHandoff => RuleCriteria::AgentRequestedHandoff,
            };

            Some(HandoffPolicyRule {
                criteria,
                priority: rule.priority.as_ref().and_then(coerce_i32).unwrap_or(0),
                active: rule.active.as_ref().and_then(coerce_bool).unwrap_or(true),
            })
        })
        .collect()
}

/// Round to 4 decimal places.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Lower-case and slugify a policy flag: keep `[a-z0-9]`, collapse everything
/// else into single underscores, trim the ends.
fn slugify_flag(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.trim().chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }
    slug
}

fn coerce_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i32(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(trigger: &str, criteria: serde_json::Value) -> RawPolicyRule {
        RawPolicyRule {
            trigger_type: trigger.to_string(),
            criteria,
            priority: None,
            active: None,
        }
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let rules = vec![raw("confidence_below_threshold", json!({"threshold": 1.5}))];
        let violations = validate_rules(&rules);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "rules[0].criteria.threshold");
        assert!(violations[0].message.contains("[0, 1]"));
    }

    #[test]
    fn test_valid_threshold_accepted_and_rounded() {
        let rules = vec![raw("confidence_below_threshold", json!({"threshold": 0.4}))];
        assert!(validate_rules(&rules).is_empty());

        let normalized = normalize_rules(rules);
        assert_eq!(normalized.len(), 1);
        match &normalized[0].criteria {
            RuleCriteria::ConfidenceBelowThreshold { threshold } => {
                assert!((threshold - 0.4).abs() < f64::EPSILON);
            }
            other => panic!("unexpected criteria: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_rounds_to_four_places() {
        let rules = vec![raw(
            "confidence_below_threshold",
            json!({"threshold": 0.123456789}),
        )];
        let normalized = normalize_rules(rules);
        match &normalized[0].criteria {
            RuleCriteria::ConfidenceBelowThreshold { threshold } => {
                assert!((threshold - 0.1235).abs() < 1e-12);
            }
            other => panic!("unexpected criteria: {:?}", other),
        }
    }

    #[test]
    fn test_missing_threshold_reported() {
        let rules = vec![raw("confidence_below_threshold", json!({}))];
        let violations = validate_rules(&rules);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("required"));
    }

    #[test]
    fn test_unknown_trigger_skipped_not_failed() {
        let rules = vec![
            raw("sentiment_swing", json!({"delta": 0.9})),
            raw("tool_error", json!({"retryable": "yes"})),
        ];
        let violations = validate_rules(&rules);
        // Only the recognized rule is checked.
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 1);
        assert_eq!(violations[0].path, "rules[1].criteria.retryable");
    }

    #[test]
    fn test_unknown_trigger_dropped_by_normalizer() {
        let rules = vec![
            raw("sentiment_swing", json!({})),
            raw("agent_requested_handoff", json!({})),
        ];
        let normalized = normalize_rules(rules);
        assert_eq!(normalized.len(), 1);
        assert_eq!(
            normalized[0].criteria.trigger_type(),
            TriggerType::AgentRequestedHandoff
        );
    }

    #[test]
    fn test_flags_validation_paths() {
        let rules = vec![raw(
            "policy_flag_detected",
            json!({"flags": ["ok", "  ", 7]}),
        )];
        let violations = validate_rules(&rules);
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["rules[0].criteria.flags[1]", "rules[0].criteria.flags[2]"]
        );
    }

    #[test]
    fn test_empty_flags_rejected() {
        let rules = vec![raw("policy_flag_detected", json!({"flags": []}))];
        let violations = validate_rules(&rules);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "rules[0].criteria.flags");
        assert!(violations[0].message.contains("empty"));
    }

    #[test]
    fn test_flags_slugified_and_deduplicated() {
        let rules = vec![raw(
            "policy_flag_detected",
            json!({"flags": ["Billing Issue!", "billing-issue", "PII leak"]}),
        )];
        let normalized = normalize_rules(rules);
        match &normalized[0].criteria {
            RuleCriteria::PolicyFlagDetected { flags } => {
                assert_eq!(flags, &vec!["billing_issue".to_string(), "pii_leak".to_string()]);
            }
            other => panic!("unexpected criteria: {:?}", other),
        }
    }

    #[test]
    fn test_boolean_coercions_and_defaults() {
        let rules = vec![RawPolicyRule {
            trigger_type: "tool_error".to_string(),
            criteria: json!({"retryable": "true"}),
            priority: Some(json!("5")),
            active: Some(json!(0)),
        }];
        let normalized = normalize_rules(rules);
        assert_eq!(normalized.len(), 1);
        assert_eq!(
            normalized[0].criteria,
            RuleCriteria::ToolError { retryable: true }
        );
        assert_eq!(normalized[0].priority, 5);
        assert!(!normalized[0].active);

        let defaults = normalize_rules(vec![raw("agent_requested_handoff", json!({}))]);
        assert_eq!(defaults[0].priority, 0);
        assert!(defaults[0].active);
    }

    #[test]
    fn test_agent_requested_needs_no_criteria() {
        let rules = vec![raw("agent_requested_handoff", serde_json::Value::Null)];
        assert!(validate_rules(&rules).is_empty());
    }
}
