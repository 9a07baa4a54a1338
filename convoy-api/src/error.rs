//! Error Types for the Convoy API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use convoy_core::{EngineError, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (422)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested conversation does not exist
    ConversationNotFound,

    /// Requested queue does not exist
    QueueNotFound,

    /// Requested queue item does not exist
    QueueItemNotFound,

    /// Requested assignment does not exist
    AssignmentNotFound,

    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Requested lifecycle transition is illegal from the current status
    InvalidTransition,

    /// Queue item was already claimed by another user
    AlreadyClaimed,

    /// Operation conflicts with the assignment's current state
    StateConflict,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::ConversationNotFound
            | ErrorCode::QueueNotFound
            | ErrorCode::QueueItemNotFound
            | ErrorCode::AssignmentNotFound
            | ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::InvalidTransition
            | ErrorCode::AlreadyClaimed
            | ErrorCode::StateConflict => StatusCode::CONFLICT,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",

            ErrorCode::ConversationNotFound => "Conversation not found",
            ErrorCode::QueueNotFound => "Queue not found",
            ErrorCode::QueueItemNotFound => "Queue item not found",
            ErrorCode::AssignmentNotFound => "Assignment not found",
            ErrorCode::EntityNotFound => "Entity not found",

            ErrorCode::InvalidTransition => "Transition not allowed from current status",
            ErrorCode::AlreadyClaimed => "Queue item already claimed",
            ErrorCode::StateConflict => "Operation conflicts with current state",

            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (field errors, expected states, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error for the given field name.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field missing: {}", field),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM ENGINE ERRORS
// ============================================================================

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { entity, id } => {
                let code = match entity {
                    EntityKind::Conversation => ErrorCode::ConversationNotFound,
                    EntityKind::Queue => ErrorCode::QueueNotFound,
                    EntityKind::QueueItem => ErrorCode::QueueItemNotFound,
                    EntityKind::Assignment => ErrorCode::AssignmentNotFound,
                    EntityKind::Handoff | EntityKind::Message => ErrorCode::EntityNotFound,
                };
                ApiError::from_code(code).with_details(json!({ "id": id }))
            }
            EngineError::UnknownTransition { name } => {
                ApiError::internal_error(format!("Unknown transition: {}", name))
            }
            EngineError::InvalidTransition {
                name,
                current,
                expected,
            } => ApiError::new(
                ErrorCode::InvalidTransition,
                format!("Transition '{}' not allowed from status '{}'", name, current),
            )
            .with_details(json!({ "expected_statuses": expected })),
            EngineError::AlreadyClaimed { id } => {
                ApiError::from_code(ErrorCode::AlreadyClaimed)
                    .with_details(json!({ "queue_item_id": id }))
            }
            EngineError::AssignmentStateConflict {
                id,
                current,
                action,
                required,
            } => ApiError::new(
                ErrorCode::StateConflict,
                format!(
                    "Cannot {} assignment in status '{}' (requires {})",
                    action, current, required
                ),
            )
            .with_details(json!({ "assignment_id": id })),
            EngineError::Validation { field, reason } => ApiError::new(
                ErrorCode::ValidationFailed,
                format!("{}: {}", field, reason),
            )
            .with_details(json!({ "field": field })),
            EngineError::Collaborator {
                collaborator,
                reason,
            } => {
                tracing::error!(%collaborator, %reason, "collaborator failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ErrorCode::ValidationFailed.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::ConversationNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::AlreadyClaimed.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_engine_not_found_maps_to_entity_specific_code() {
        let err: ApiError = EngineError::NotFound {
            entity: EntityKind::Queue,
            id: Uuid::now_v7(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::QueueNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_transition_maps_to_conflict() {
        let err: ApiError = EngineError::InvalidTransition {
            name: "resolve".to_string(),
            current: "Queued".to_string(),
            expected: vec!["AgentWorking".to_string(), "HumanWorking".to_string()],
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.details.is_some());
    }

    #[test]
    fn test_error_serialization_uses_screaming_snake_case() {
        let err = ApiError::from_code(ErrorCode::AlreadyClaimed);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "ALREADY_CLAIMED");
    }
}
