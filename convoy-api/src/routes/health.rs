//! Health Check Routes
//!
//! Kubernetes-compatible liveness/readiness endpoints. The engine is fully
//! in-process, so readiness is equivalent to liveness here.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    Json(HealthResponse {
        status: "alive".to_string(),
    })
}

/// GET /health/ready
pub async fn readiness() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ready".to_string(),
    })
}

pub fn create_router() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
