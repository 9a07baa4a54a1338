//! Queue REST API Routes
//!
//! Queue management plus the claim endpoint. Claiming is the contention
//! point between waiting humans; the orchestrator guarantees exactly one of
//! two concurrent claimants wins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use convoy_engine::{ClaimRequest, Orchestrator};

use crate::error::{ApiError, ApiResult};
use crate::types::{ClaimQueueItemRequest, CreateQueueRequest};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/queues - Create a queue
#[utoipa::path(
    post,
    path = "/api/v1/queues",
    tag = "Queues",
    request_body = CreateQueueRequest,
    responses(
        (status = 201, description = "Queue created", body = convoy_core::Queue),
        (status = 422, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_queue(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<CreateQueueRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }

    let queue = orchestrator.create_queue(req.name, req.metadata);
    Ok((StatusCode::CREATED, Json(queue)))
}

/// GET /api/v1/queues/{id} - Get queue by ID
#[utoipa::path(
    get,
    path = "/api/v1/queues/{id}",
    tag = "Queues",
    params(
        ("id" = Uuid, Path, description = "Queue ID")
    ),
    responses(
        (status = 200, description = "Queue details", body = convoy_core::Queue),
        (status = 404, description = "Queue not found", body = ApiError),
    )
)]
pub async fn get_queue(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let queue = orchestrator.queue(id)?;
    Ok(Json(queue))
}

/// POST /api/v1/queue-items/{id}/claim - Atomically claim a queued item
#[utoipa::path(
    post,
    path = "/api/v1/queue-items/{id}/claim",
    tag = "Queues",
    params(
        ("id" = Uuid, Path, description = "Queue item ID")
    ),
    request_body = ClaimQueueItemRequest,
    responses(
        (status = 200, description = "Claim won; assignment opened", body = convoy_core::Assignment),
        (status = 404, description = "Queue item not found", body = ApiError),
        (status = 409, description = "Item already claimed", body = ApiError),
    )
)]
pub async fn claim_queue_item(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimQueueItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let assignment = orchestrator
        .claim_queue_item(ClaimRequest {
            queue_item_id: id,
            actor_id: req.actor_id,
            assignment_user_id: req.assignment_user_id,
            assignment_metadata: req.assignment_metadata,
        })
        .await?;
    Ok(Json(assignment))
}

// ============================================================================
// ROUTERS
// ============================================================================

/// Router for /api/v1/queues.
pub fn create_router(orchestrator: Arc<Orchestrator>) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(create_queue))
        .route("/:id", axum::routing::get(get_queue))
        .with_state(orchestrator)
}

/// Router for /api/v1/queue-items.
pub fn create_item_router(orchestrator: Arc<Orchestrator>) -> axum::Router {
    axum::Router::new()
        .route("/:id/claim", axum::routing::post(claim_queue_item))
        .with_state(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_request_deserializes() {
        let req: ClaimQueueItemRequest = serde_json::from_value(serde_json::json!({
            "actor_id": Uuid::now_v7(),
            "assignment_user_id": Uuid::now_v7(),
        }))
        .unwrap();
        assert!(req.assignment_metadata.is_none());
    }
}
