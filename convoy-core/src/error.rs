//! Error types for Convoy operations

use crate::EntityId;
use thiserror::Error;

/// Entity type discriminator for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Conversation,
    Queue,
    QueueItem,
    Assignment,
    Handoff,
    Message,
}

/// Errors raised by the transition engine and the orchestration layer.
///
/// The API layer maps these onto HTTP semantics: `NotFound` is a 404,
/// `InvalidTransition` / `AlreadyClaimed` are 409 conflicts (the caller
/// decides whether to retry), `Validation` is a 422, `Collaborator` is a 500.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("{entity:?} with id {id} not found")]
    NotFound { entity: EntityKind, id: EntityId },

    #[error("Unknown transition: {name}")]
    UnknownTransition { name: String },

    #[error("Transition '{name}' is illegal from state '{current}' (legal from: {expected:?})")]
    InvalidTransition {
        name: String,
        current: String,
        expected: Vec<String>,
    },

    #[error("Queue item {id} already claimed")]
    AlreadyClaimed { id: EntityId },

    #[error("Assignment {id} is '{current}', but {action} requires '{required}'")]
    AssignmentStateConflict {
        id: EntityId,
        current: String,
        action: String,
        required: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Collaborator '{collaborator}' failed: {reason}")]
    Collaborator { collaborator: String, reason: String },
}

impl EngineError {
    /// Convenience constructor for missing entities.
    pub fn not_found(entity: EntityKind, id: EntityId) -> Self {
        EngineError::NotFound { entity, id }
    }

    /// Convenience constructor for field validation failures.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that represent a lost race or a precondition failure,
    /// i.e. everything the API surfaces as a 409.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidTransition { .. }
                | EngineError::AlreadyClaimed { .. }
                | EngineError::AssignmentStateConflict { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
