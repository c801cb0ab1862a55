//! Service API Handlers
//!
//! Banner, health check and executor statistics.

use axum::{Json, extract::State};
use chrono::Utc;
use errand_core::dto::service::{HealthResponse, ServiceInfo, StatsResponse};

use crate::api::error::ApiResult;
use crate::service::job_service;
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /
/// Service banner
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Errand job execution API".to_string(),
        version: VERSION.to_string(),
        health: "/health".to_string(),
        tasks: "/tasks".to_string(),
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /stats
/// Executor load and job counts per status
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let jobs = job_service::job_counts(&*state.jobs).await?;

    Ok(Json(StatsResponse {
        executor: state.executor.stats(),
        jobs,
    }))
}
