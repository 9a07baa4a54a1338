//! OpenAPI Specification for the Convoy API
//!
//! Uses utoipa to generate the OpenAPI document from Rust types and route
//! annotations.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{assignment, conversation, policy, queue};
use crate::types::{
    AcceptAssignmentRequest, AppendMessageRequest, ClaimQueueItemRequest,
    CreateConversationRequest, CreateQueueRequest, ReleaseAssignmentRequest,
    ResolveAssignmentRequest, ResolveConversationRequest, TriggerHandoffRequest,
    ValidatePolicyRulesRequest, ValidatePolicyRulesResponse,
};

use convoy_core::{
    Assignment, AssignmentStatus, Channel, Conversation, ConversationPriority,
    ConversationStatus, Handoff, HandoffPolicyRule, MessageSender, Queue, QueueItem,
    QueueItemState, RawPolicyRule, Requester, RequesterKind, RuleCriteria, RuleViolation,
    TriggerType,
};
use convoy_engine::ConversationView;

/// OpenAPI document for the Convoy API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Convoy API",
        version = "0.1.0",
        description = "Conversation routing and handoff orchestration between automated agents and human operators",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Conversations", description = "Conversation lifecycle - creation, messages, handoff, resolution"),
        (name = "Queues", description = "Human work queues and atomic claim"),
        (name = "Assignments", description = "Human ownership windows - accept, release, resolve"),
        (name = "Policies", description = "Handoff policy rule validation and normalization"),
    ),
    paths(
        conversation::create_conversation,
        conversation::get_conversation,
        conversation::append_message,
        conversation::trigger_handoff,
        conversation::resolve_conversation,
        queue::create_queue,
        queue::get_queue,
        queue::claim_queue_item,
        assignment::get_assignment,
        assignment::accept_assignment,
        assignment::release_assignment,
        assignment::resolve_assignment,
        policy::validate_policy_rules,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        Conversation,
        ConversationStatus,
        ConversationPriority,
        Requester,
        RequesterKind,
        Channel,
        MessageSender,
        convoy_core::Message,
        Queue,
        QueueItem,
        QueueItemState,
        Assignment,
        AssignmentStatus,
        Handoff,
        ConversationView,
        TriggerType,
        RawPolicyRule,
        RuleCriteria,
        HandoffPolicyRule,
        RuleViolation,
        CreateConversationRequest,
        AppendMessageRequest,
        TriggerHandoffRequest,
        ResolveConversationRequest,
        CreateQueueRequest,
        ClaimQueueItemRequest,
        AcceptAssignmentRequest,
        ReleaseAssignmentRequest,
        ResolveAssignmentRequest,
        ValidatePolicyRulesRequest,
        ValidatePolicyRulesResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_generates() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/v1/conversations/{id}/handoff"));
        assert!(json.contains("/api/v1/queue-items/{id}/claim"));
        assert!(json.contains("/api/v1/handoff-policy-rules/validate"));
    }
}
