//! REST API Routes Module
//!
//! Route handlers organized by entity type, plus router assembly with CORS,
//! request tracing, and the OpenAPI document endpoint.

pub mod assignment;
pub mod conversation;
pub mod health;
pub mod policy;
pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use convoy_engine::Orchestrator;

use crate::config::ApiConfig;

// Re-export route creation functions for convenience
pub use assignment::create_router as assignment_router;
pub use conversation::create_router as conversation_router;
pub use health::create_router as health_router;
pub use policy::create_router as policy_router;
pub use queue::create_router as queue_router;

/// Create the full API router.
pub fn create_api_router(orchestrator: Arc<Orchestrator>, config: &ApiConfig) -> Router {
    let api_routes = Router::new()
        .nest("/conversations", conversation::create_router(orchestrator.clone()))
        .nest("/queues", queue::create_router(orchestrator.clone()))
        .nest("/queue-items", queue::create_item_router(orchestrator.clone()))
        .nest("/assignments", assignment::create_router(orchestrator))
        .nest("/handoff-policy-rules", policy::create_router());

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router());

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    router
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

#[cfg(feature = "openapi")]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}
