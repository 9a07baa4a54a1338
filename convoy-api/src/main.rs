//! Convoy API Server Entry Point
//!
//! Bootstraps tracing and configuration, wires the orchestrator with its
//! default collaborators, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convoy_api::{create_api_router, ApiConfig, ApiError, ApiResult};
use convoy_engine::{LoggingScheduler, NoopAuditSink, Orchestrator, Store};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("convoy_api=debug,tower_http=debug,info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(Store::new());
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        Arc::new(LoggingScheduler),
        Arc::new(NoopAuditSink),
    ));

    let api_config = ApiConfig::from_env();
    let app: Router = create_api_router(orchestrator, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Convoy API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("CONVOY_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("CONVOY_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
