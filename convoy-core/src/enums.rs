//! Enum types for Convoy entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CONVERSATION ENUMS
// ============================================================================

/// Lifecycle status of a conversation.
///
/// Mutated only through the transition engine; direct writes are forbidden
/// outside it. `Archived` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Freshly created, no automation started yet
    New,
    /// The automated agent is working on the conversation
    AgentWorking,
    /// Escalation decided, not yet enqueued
    NeedsHuman,
    /// Waiting in a queue for a human to claim
    Queued,
    /// Claimed by a human, not yet accepted
    Assigned,
    /// A human is actively working the conversation
    HumanWorking,
    /// Returned from a human toward the automated agent
    BackToAgent,
    /// Resolved (by agent or human)
    Resolved,
    /// Archived (terminal)
    Archived,
}

impl ConversationStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ConversationStatus::New => "new",
            ConversationStatus::AgentWorking => "agent_working",
            ConversationStatus::NeedsHuman => "needs_human",
            ConversationStatus::Queued => "queued",
            ConversationStatus::Assigned => "assigned",
            ConversationStatus::HumanWorking => "human_working",
            ConversationStatus::BackToAgent => "back_to_agent",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Archived => "archived",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ConversationStatusParseError> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ConversationStatus::New),
            "agent_working" => Ok(ConversationStatus::AgentWorking),
            "needs_human" => Ok(ConversationStatus::NeedsHuman),
            "queued" => Ok(ConversationStatus::Queued),
            "assigned" => Ok(ConversationStatus::Assigned),
            "human_working" => Ok(ConversationStatus::HumanWorking),
            "back_to_agent" => Ok(ConversationStatus::BackToAgent),
            "resolved" => Ok(ConversationStatus::Resolved),
            "archived" => Ok(ConversationStatus::Archived),
            _ => Err(ConversationStatusParseError(s.to_string())),
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStatus::Archived)
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = ConversationStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid conversation status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationStatusParseError(pub String);

impl fmt::Display for ConversationStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid conversation status: {}", self.0)
    }
}

impl std::error::Error for ConversationStatusParseError {}

/// Priority of a conversation, set at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConversationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Kind of requester on the other side of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RequesterKind {
    /// Known customer with an account
    Customer,
    /// Anonymous or pre-sales visitor
    Visitor,
    /// Internal user (dogfooding, testing)
    Internal,
}

/// Channel a message or transition arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Web,
    Email,
    Chat,
    Api,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Web => "web",
            Channel::Email => "email",
            Channel::Chat => "chat",
            Channel::Api => "api",
        };
        write!(f, "{}", s)
    }
}

/// Who authored a message in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    Requester,
    Agent,
    Human,
}

// ============================================================================
// QUEUE ENUMS
// ============================================================================

/// State of a queue item.
///
/// `Hot` means claimed (dequeued) but not yet completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum QueueItemState {
    Queued,
    Hot,
    Completed,
}

impl QueueItemState {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            QueueItemState::Queued => "queued",
            QueueItemState::Hot => "hot",
            QueueItemState::Completed => "completed",
        }
    }

    /// An item counts toward the one-active-item-per-conversation invariant
    /// until it completes.
    pub fn is_active(&self) -> bool {
        !matches!(self, QueueItemState::Completed)
    }
}

impl fmt::Display for QueueItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// ASSIGNMENT ENUMS
// ============================================================================

/// Status of a human's ownership window over a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Claimed, waiting for the human to accept
    Assigned,
    /// Accepted; the human is engaged
    HumanWorking,
    /// Released without resolution (terminal)
    Released,
    /// Resolved by the human (terminal)
    Resolved,
}

impl AssignmentStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::HumanWorking => "human_working",
            AssignmentStatus::Released => "released",
            AssignmentStatus::Resolved => "resolved",
        }
    }

    /// A "current" assignment is one that has been neither released nor
    /// resolved. At most one exists per conversation at any time.
    pub fn is_current(&self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::HumanWorking)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_status_roundtrip() {
        for status in [
            ConversationStatus::New,
            ConversationStatus::AgentWorking,
            ConversationStatus::NeedsHuman,
            ConversationStatus::Queued,
            ConversationStatus::Assigned,
            ConversationStatus::HumanWorking,
            ConversationStatus::BackToAgent,
            ConversationStatus::Resolved,
            ConversationStatus::Archived,
        ] {
            let db_str = status.as_db_str();
            let parsed = ConversationStatus::from_db_str(db_str).unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_conversation_status_parse_error() {
        assert!(ConversationStatus::from_db_str("sleeping").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConversationStatus::Archived.is_terminal());
        assert!(!ConversationStatus::Resolved.is_terminal());
    }

    #[test]
    fn test_queue_item_active() {
        assert!(QueueItemState::Queued.is_active());
        assert!(QueueItemState::Hot.is_active());
        assert!(!QueueItemState::Completed.is_active());
    }

    #[test]
    fn test_assignment_current() {
        assert!(AssignmentStatus::Assigned.is_current());
        assert!(AssignmentStatus::HumanWorking.is_current());
        assert!(!AssignmentStatus::Released.is_current());
        assert!(!AssignmentStatus::Resolved.is_current());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(ConversationPriority::Urgent > ConversationPriority::Normal);
        assert_eq!(ConversationPriority::default(), ConversationPriority::Normal);
    }
}
