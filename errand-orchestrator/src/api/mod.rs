//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Service endpoints
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .route("/stats", get(health::stats))
        // Job endpoints
        .route("/tasks", get(job::list_jobs).post(job::create_job))
        .route("/tasks/{id}", get(job::get_job).delete(job::delete_job))
        .route("/tasks/{id}/files/{*path}", get(job::download_file))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
