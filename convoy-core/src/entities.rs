//! Core entity structures

use crate::{
    AssignmentStatus, Channel, ConversationPriority, ConversationStatus, EntityId, MessageSender,
    QueueItemState, RequesterKind, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The party a conversation is held with: a kind plus an opaque external
/// identifier owned by the surrounding system (CRM id, email hash, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Requester {
    pub kind: RequesterKind,
    pub external_ref: String,
}

/// Conversation - a single support interaction tracked end-to-end from
/// creation to archival.
///
/// `status` is mutated only through the transition engine; every other field
/// is plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Conversation {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: EntityId,
    pub status: ConversationStatus,
    pub priority: ConversationPriority,
    pub requester: Requester,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_activity_at: Timestamp,
}

impl Conversation {
    /// Create a new conversation in status `new`.
    pub fn new(requester: Requester, priority: ConversationPriority) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: Uuid::now_v7(),
            status: ConversationStatus::New,
            priority,
            requester,
            metadata: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Attach free-form metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Mark activity on the conversation.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity_at = now;
    }
}

impl crate::machine::StateHolder for Conversation {
    type State = ConversationStatus;

    fn state(&self) -> ConversationStatus {
        self.status
    }

    fn set_state(&mut self, next: ConversationStatus) {
        self.status = next;
    }
}

/// Message - one entry in a conversation's ordered message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub message_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: EntityId,
    /// Position in the conversation's log, starting at 1
    pub sequence: i64,
    pub sender: MessageSender,
    pub content: String,
    pub channel: Option<Channel>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Queue - a named pool of conversations waiting for human attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Queue {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub queue_id: EntityId,
    pub name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Queue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            queue_id: Uuid::now_v7(),
            name: name.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

/// QueueItem - a conversation's waiting-for-human placeholder in a queue.
///
/// A conversation may accumulate historical items but holds at most one
/// active (non-completed) item at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QueueItem {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub queue_item_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub queue_id: EntityId,
    pub state: QueueItemState,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub enqueued_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub dequeued_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

impl QueueItem {
    /// Create a queued item for a conversation.
    pub fn enqueue(
        conversation_id: EntityId,
        queue_id: EntityId,
        enqueued_at: Timestamp,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            queue_item_id: Uuid::now_v7(),
            conversation_id,
            queue_id,
            state: QueueItemState::Queued,
            enqueued_at,
            dequeued_at: None,
            completed_at: None,
            metadata,
        }
    }
}

/// Assignment - a human's ownership window over a conversation, from claim
/// through accept, release, or resolve. Never deleted; kept for audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Assignment {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub assignment_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub queue_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: EntityId,
    pub status: AssignmentStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub assigned_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub accepted_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub released_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub resolved_at: Option<Timestamp>,
    pub release_reason: Option<String>,
    pub resolution_summary: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

impl Assignment {
    /// Create a fresh assignment at claim time.
    pub fn claim(
        conversation_id: EntityId,
        queue_id: EntityId,
        user_id: EntityId,
        assigned_at: Timestamp,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            assignment_id: Uuid::now_v7(),
            conversation_id,
            queue_id,
            user_id,
            status: AssignmentStatus::Assigned,
            assigned_at,
            accepted_at: None,
            released_at: None,
            resolved_at: None,
            release_reason: None,
            resolution_summary: None,
            metadata,
        }
    }

    /// Whether this assignment is the conversation's current one.
    pub fn is_current(&self) -> bool {
        self.released_at.is_none() && self.resolved_at.is_none()
    }
}

/// Handoff - append-only log entry created each time a conversation is
/// escalated from automation to a human queue. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Handoff {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub handoff_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: EntityId,
    pub reason_code: String,
    /// Agent confidence at escalation time, within [0, 1]
    pub confidence: Option<f64>,
    /// Identifiers of the policy rules that matched
    pub policy_hits: Vec<String>,
    pub required_skills: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Audit event emitted for every committed transition.
///
/// Buffered inside the transaction and delivered to the configured sink
/// after commit, so downstream consumers never observe uncommitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub conversation_id: EntityId,
    pub transition: String,
    pub status_after: ConversationStatus,
    pub occurred_at: Timestamp,
    pub context: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester() -> Requester {
        Requester {
            kind: RequesterKind::Customer,
            external_ref: "crm:4211".to_string(),
        }
    }

    #[test]
    fn test_new_conversation_defaults() {
        let conv = Conversation::new(requester(), ConversationPriority::Normal);
        assert_eq!(conv.status, ConversationStatus::New);
        assert_eq!(conv.created_at, conv.last_activity_at);
        assert!(conv.metadata.is_none());
    }

    #[test]
    fn test_touch_updates_activity() {
        let mut conv = Conversation::new(requester(), ConversationPriority::High);
        let later = conv.created_at + chrono::Duration::seconds(30);
        conv.touch(later);
        assert_eq!(conv.last_activity_at, later);
    }

    #[test]
    fn test_assignment_current_tracks_timestamps() {
        let now = Utc::now();
        let mut assignment =
            Assignment::claim(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), now, None);
        assert!(assignment.is_current());

        assignment.released_at = Some(now);
        assert!(!assignment.is_current());
    }

    #[test]
    fn test_queue_item_enqueue_state() {
        let item = QueueItem::enqueue(Uuid::now_v7(), Uuid::now_v7(), Utc::now(), None);
        assert_eq!(item.state, QueueItemState::Queued);
        assert!(item.dequeued_at.is_none());
        assert!(item.completed_at.is_none());
    }
}
