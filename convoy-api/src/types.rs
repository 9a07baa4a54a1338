//! Request and Response Types for the Convoy API
//!
//! DTOs for every REST endpoint. Domain entities from `convoy-core` are
//! returned directly where they already are the natural representation.

use convoy_core::{
    Channel, ConversationPriority, EntityId, HandoffPolicyRule, MessageSender, RawPolicyRule,
    RequesterKind, RuleViolation,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONVERSATION TYPES
// ============================================================================

/// Request to create a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateConversationRequest {
    /// Who opened the conversation
    pub requester_kind: RequesterKind,
    /// Opaque requester identifier (customer id, session token, ...)
    pub requester_ref: String,
    /// Routing priority (defaults to normal)
    #[serde(default)]
    pub priority: ConversationPriority,
    /// Free-form metadata
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

/// Request to append a message to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppendMessageRequest {
    /// Message body
    pub content: String,
    /// Who sent it (defaults to the requester)
    #[serde(default)]
    pub sender: Option<MessageSender>,
    /// Channel the message arrived on
    pub channel: Option<Channel>,
    /// Free-form metadata
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

/// Request to escalate a conversation to a human queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TriggerHandoffRequest {
    /// Why automation is handing off
    pub reason_code: String,
    /// Target queue
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub queue_id: EntityId,
    /// Agent confidence at handoff time, within [0, 1]
    pub confidence: Option<f64>,
    /// Policy rules that fired
    #[serde(default)]
    pub policy_hits: Vec<String>,
    /// Skills the handling human should have
    #[serde(default)]
    pub required_skills: Vec<String>,
    /// Metadata stored on the handoff record
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub handoff_metadata: Option<serde_json::Value>,
    /// Metadata stored on the queue item
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub queue_item_metadata: Option<serde_json::Value>,
    /// Channel the escalation came from
    pub channel: Option<Channel>,
}

/// Request to resolve a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResolveConversationRequest {
    /// Resolution summary
    pub summary: String,
    /// Acting user, if resolution came from a human
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub actor_id: Option<EntityId>,
}

// ============================================================================
// QUEUE TYPES
// ============================================================================

/// Request to create a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateQueueRequest {
    /// Human-readable queue name
    pub name: String,
    /// Free-form metadata
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

/// Request to claim a queued item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClaimQueueItemRequest {
    /// User performing the claim
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub actor_id: EntityId,
    /// User the assignment is opened for (usually the actor)
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub assignment_user_id: EntityId,
    /// Metadata stored on the assignment
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub assignment_metadata: Option<serde_json::Value>,
}

// ============================================================================
// ASSIGNMENT TYPES
// ============================================================================

/// Request to accept an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AcceptAssignmentRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub actor_id: EntityId,
}

/// Request to release an assignment back toward the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReleaseAssignmentRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub actor_id: EntityId,
    /// Optional release reason
    pub reason: Option<String>,
}

/// Request to resolve a conversation through its assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResolveAssignmentRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub actor_id: EntityId,
    /// Resolution summary
    pub summary: String,
}

// ============================================================================
// POLICY TYPES
// ============================================================================

/// Request to validate and normalize handoff policy rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidatePolicyRulesRequest {
    pub rules: Vec<RawPolicyRule>,
}

/// Validation outcome: violations are data here, not HTTP errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidatePolicyRulesResponse {
    pub errors: Vec<RuleViolation>,
    pub normalized: Vec<HandoffPolicyRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_conversation_request_defaults() {
        let req: CreateConversationRequest = serde_json::from_str(
            r#"{"requester_kind": "customer", "requester_ref": "cust-1", "metadata": null}"#,
        )
        .unwrap();
        assert_eq!(req.priority, ConversationPriority::Normal);
    }

    #[test]
    fn test_handoff_request_optional_lists_default_empty() {
        let req: TriggerHandoffRequest = serde_json::from_value(serde_json::json!({
            "reason_code": "low_confidence",
            "queue_id": uuid::Uuid::now_v7(),
        }))
        .unwrap();
        assert!(req.policy_hits.is_empty());
        assert!(req.required_skills.is_empty());
        assert!(req.confidence.is_none());
    }
}
