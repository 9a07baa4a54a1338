//! Assignment REST API Routes
//!
//! Accept, release, and resolve. The orchestrator keeps assignment status
//! and conversation status in lockstep within one commit.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use convoy_engine::Orchestrator;

use crate::error::{ApiError, ApiResult};
use crate::types::{AcceptAssignmentRequest, ReleaseAssignmentRequest, ResolveAssignmentRequest};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/assignments/{id} - Get assignment by ID
#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}",
    tag = "Assignments",
    params(
        ("id" = Uuid, Path, description = "Assignment ID")
    ),
    responses(
        (status = 200, description = "Assignment details", body = convoy_core::Assignment),
        (status = 404, description = "Assignment not found", body = ApiError),
    )
)]
pub async fn get_assignment(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let assignment = orchestrator.assignment(id)?;
    Ok(Json(assignment))
}

/// POST /api/v1/assignments/{id}/accept - Accept a claimed assignment
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/accept",
    tag = "Assignments",
    params(
        ("id" = Uuid, Path, description = "Assignment ID")
    ),
    request_body = AcceptAssignmentRequest,
    responses(
        (status = 200, description = "Assignment accepted", body = convoy_core::Assignment),
        (status = 404, description = "Assignment not found", body = ApiError),
        (status = 409, description = "Assignment not in assigned state", body = ApiError),
    )
)]
pub async fn accept_assignment(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptAssignmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let assignment = orchestrator.accept_assignment(id, req.actor_id).await?;
    Ok(Json(assignment))
}

/// POST /api/v1/assignments/{id}/release - Release an assignment
///
/// The conversation always routes back to the agent on release; a fresh
/// handoff is needed to re-queue it.
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/release",
    tag = "Assignments",
    params(
        ("id" = Uuid, Path, description = "Assignment ID")
    ),
    request_body = ReleaseAssignmentRequest,
    responses(
        (status = 200, description = "Assignment released", body = convoy_core::Assignment),
        (status = 404, description = "Assignment not found", body = ApiError),
        (status = 409, description = "Assignment already released or resolved", body = ApiError),
    )
)]
pub async fn release_assignment(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReleaseAssignmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let assignment = orchestrator
        .release_assignment(id, req.actor_id, req.reason)
        .await?;
    Ok(Json(assignment))
}

/// POST /api/v1/assignments/{id}/resolve - Resolve through the assignment
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/resolve",
    tag = "Assignments",
    params(
        ("id" = Uuid, Path, description = "Assignment ID")
    ),
    request_body = ResolveAssignmentRequest,
    responses(
        (status = 200, description = "Assignment resolved; conversation resolved (and archived when legal)", body = convoy_core::Assignment),
        (status = 404, description = "Assignment not found", body = ApiError),
        (status = 409, description = "Assignment not in human_working state", body = ApiError),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn resolve_assignment(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveAssignmentRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.summary.trim().is_empty() {
        return Err(ApiError::missing_field("summary"));
    }

    let assignment = orchestrator
        .resolve_assignment(id, req.actor_id, req.summary)
        .await?;
    Ok(Json(assignment))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> axum::Router {
    axum::Router::new()
        .route("/:id", axum::routing::get(get_assignment))
        .route("/:id/accept", axum::routing::post(accept_assignment))
        .route("/:id/release", axum::routing::post(release_assignment))
        .route("/:id/resolve", axum::routing::post(resolve_assignment))
        .with_state(orchestrator)
}
