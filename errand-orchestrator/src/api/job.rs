//! Job API Handlers
//!
//! HTTP endpoints for job submission, inspection, removal and artifact
//! download. Malformed bodies, ids and query strings are reported as
//! `400` with the same JSON error body as every other failure.

use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use errand_core::domain::job::Job;
use errand_core::dto::job::{CreateJob, ListJobsQuery};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::service::{artifact_service, job_service};
use crate::state::AppState;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /tasks
/// Submit a new job; it is executed in the background
pub async fn create_job(
    State(state): State<AppState>,
    req: Result<Json<CreateJob>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let Json(req) = req.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let job = job_service::launch_job(&*state.jobs, &state.executor, req).await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /tasks
/// List jobs newest first
///
/// Query parameters:
/// - `status_filter` (optional): only jobs in this status
/// - `limit` (optional, default 100): maximum number of records
pub async fn list_jobs(
    State(state): State<AppState>,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Job>>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::debug!(
        "Listing jobs (status: {:?}, limit: {})",
        query.status_filter,
        query.limit()
    );

    let jobs = job_service::list_jobs(&*state.jobs, &query).await?;

    Ok(Json(jobs))
}

/// GET /tasks/{id}
/// Get job details by ID
pub async fn get_job(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Job>> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(&*state.jobs, id).await?;

    Ok(Json(job))
}

/// DELETE /tasks/{id}
/// Remove a job's record; a running execution is left to finish
pub async fn delete_job(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    job_service::delete_job(&*state.jobs, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Artifact Endpoints
// =============================================================================

/// GET /tasks/{id}/files/{*path}
/// Download a file produced by a job
///
/// `path` is relative to the workspace root, as listed in the job's `files`.
/// The body is streamed from disk.
pub async fn download_file(
    State(state): State<AppState>,
    params: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((id, path)) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::debug!("Downloading '{}' for job {}", path, id);

    let resolved =
        artifact_service::resolve_artifact(&*state.jobs, &state.workspace, &id, &path).await?;
    let file = File::open(&resolved)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to open {}: {}", path, e)))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to stat {}: {}", path, e)))?
        .len();

    let filename = resolved
        .file_name()
        .map(|name| name.to_string_lossy().replace(['"', '\\'], "_"))
        .unwrap_or_else(|| "download".to_string());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
