//! Service-level DTOs: banner, health and runtime statistics

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub health: String,
    pub tasks: String,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the executor's concurrency gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    pub max_concurrent_jobs: usize,
    /// Submitted jobs waiting for a free execution slot
    pub backlog: usize,
    /// Jobs currently holding an execution slot
    pub running: usize,
}

/// Response of `GET /stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub executor: ExecutorStats,
    /// Job counts keyed by lowercase status name
    pub jobs: BTreeMap<String, usize>,
}
