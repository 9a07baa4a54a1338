//! Conversation REST API Routes
//!
//! Creation, reads, and the three orchestration endpoints: message append,
//! handoff trigger, and resolution. All handlers delegate to the
//! Orchestrator, which owns locking and atomicity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use convoy_core::{MessageSender, Requester};
use convoy_engine::{AppendMessage, HandoffRequest, Orchestrator, ResolutionRequest};

use crate::error::{ApiError, ApiResult};
use crate::types::{
    AppendMessageRequest, CreateConversationRequest, ResolveConversationRequest,
    TriggerHandoffRequest,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/conversations - Open a new conversation
#[utoipa::path(
    post,
    path = "/api/v1/conversations",
    tag = "Conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = convoy_core::Conversation),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_conversation(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.requester_ref.trim().is_empty() {
        return Err(ApiError::missing_field("requester_ref"));
    }

    let conversation = orchestrator.create_conversation(
        Requester {
            kind: req.requester_kind,
            external_ref: req.requester_ref,
        },
        req.priority,
        req.metadata,
    );
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/v1/conversations/{id} - Full conversation representation
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}",
    tag = "Conversations",
    params(
        ("id" = Uuid, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Conversation with messages, queue items, handoffs and current assignment", body = convoy_engine::ConversationView),
        (status = 404, description = "Conversation not found", body = ApiError),
    )
)]
pub async fn get_conversation(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let view = orchestrator.conversation_view(id)?;
    Ok(Json(view))
}

/// POST /api/v1/conversations/{id}/messages - Append a message
///
/// Also makes sure the automated agent is working the conversation; the
/// background run is scheduled at most once per transition into
/// `agent_working`, no matter how many appends race.
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    tag = "Conversations",
    params(
        ("id" = Uuid, Path, description = "Conversation ID")
    ),
    request_body = AppendMessageRequest,
    responses(
        (status = 201, description = "Message appended", body = convoy_engine::ConversationView),
        (status = 404, description = "Conversation not found", body = ApiError),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn append_message(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AppendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    orchestrator
        .append_message(AppendMessage {
            conversation_id: id,
            sender: req.sender.unwrap_or(MessageSender::Requester),
            content: req.content,
            channel: req.channel,
            metadata: req.metadata,
        })
        .await?;

    let view = orchestrator.conversation_view(id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/conversations/{id}/handoff - Escalate to a human queue
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/handoff",
    tag = "Conversations",
    params(
        ("id" = Uuid, Path, description = "Conversation ID")
    ),
    request_body = TriggerHandoffRequest,
    responses(
        (status = 200, description = "Conversation handed off and enqueued", body = convoy_engine::ConversationView),
        (status = 404, description = "Conversation or queue not found", body = ApiError),
        (status = 409, description = "Handoff not allowed from current status", body = ApiError),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn trigger_handoff(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TriggerHandoffRequest>,
) -> ApiResult<impl IntoResponse> {
    let view = orchestrator
        .trigger_handoff(HandoffRequest {
            conversation_id: id,
            queue_id: req.queue_id,
            reason_code: req.reason_code,
            confidence: req.confidence,
            policy_hits: req.policy_hits,
            required_skills: req.required_skills,
            handoff_metadata: req.handoff_metadata,
            queue_item_metadata: req.queue_item_metadata,
            channel: req.channel,
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/conversations/{id}/resolution - Resolve a conversation
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/resolution",
    tag = "Conversations",
    params(
        ("id" = Uuid, Path, description = "Conversation ID")
    ),
    request_body = ResolveConversationRequest,
    responses(
        (status = 200, description = "Conversation resolved (and archived when legal)", body = convoy_core::Conversation),
        (status = 404, description = "Conversation not found", body = ApiError),
        (status = 409, description = "Resolve not allowed from current status", body = ApiError),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn resolve_conversation(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let conversation = orchestrator
        .resolve_conversation(ResolutionRequest {
            conversation_id: id,
            summary: req.summary,
            actor: req.actor_id,
        })
        .await?;
    Ok(Json(conversation))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(create_conversation))
        .route("/:id", axum::routing::get(get_conversation))
        .route("/:id/messages", axum::routing::post(append_message))
        .route("/:id/handoff", axum::routing::post(trigger_handoff))
        .route("/:id/resolution", axum::routing::post(resolve_conversation))
        .with_state(orchestrator)
}
