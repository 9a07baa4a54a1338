//! Convoy API - REST Layer
//!
//! Axum HTTP surface over the `convoy-engine` orchestrator:
//! - Conversation lifecycle endpoints (create, messages, handoff, resolution)
//! - Queue management and atomic claim
//! - Assignment accept/release/resolve
//! - Handoff policy rule validation
//! - OpenAPI document generation

pub mod config;
pub mod error;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
