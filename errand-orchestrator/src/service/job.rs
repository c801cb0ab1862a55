//! Job Service
//!
//! Business logic for job submission, lookup, listing and removal.

use std::collections::BTreeMap;

use errand_core::domain::job::{Job, JobStatus};
use errand_core::dto::job::{CreateJob, ListJobsQuery};
use uuid::Uuid;

use crate::repository::{JobRepository, RepositoryError};
use crate::scheduler::JobExecutor;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validate, record and schedule a new job
///
/// Returns the freshly created `pending` record without waiting for the
/// execution to start.
pub async fn launch_job(
    jobs: &dyn JobRepository,
    executor: &JobExecutor,
    req: CreateJob,
) -> Result<Job, JobError> {
    validate_create_request(&req)?;

    let job = jobs.create(req).await?;
    executor.submit(job.id, job.prompt.clone(), job.mode);

    tracing::info!("Job {} created and queued ({} mode)", job.id, job.mode);

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(jobs: &dyn JobRepository, id: Uuid) -> Result<Job, JobError> {
    let job = jobs.find_by_id(id).await?.ok_or(JobError::NotFound(id))?;
    Ok(job)
}

/// List jobs newest first
pub async fn list_jobs(jobs: &dyn JobRepository, query: &ListJobsQuery) -> Result<Vec<Job>, JobError> {
    let jobs = jobs.list(query.status_filter, query.limit()).await?;
    Ok(jobs)
}

/// Remove a job's tracking record
///
/// The execution, if still in flight, is not interrupted; its outcome is
/// discarded when it finishes.
pub async fn delete_job(jobs: &dyn JobRepository, id: Uuid) -> Result<(), JobError> {
    if !jobs.delete(id).await? {
        return Err(JobError::NotFound(id));
    }

    tracing::info!("Job {} removed", id);

    Ok(())
}

/// Count jobs per status, keyed by the lowercase status name
pub async fn job_counts(jobs: &dyn JobRepository) -> Result<BTreeMap<String, usize>, JobError> {
    let counts = jobs.count_by_status().await?;

    Ok(JobStatus::ALL
        .iter()
        .map(|status| {
            (
                status.as_str().to_string(),
                counts.get(status).copied().unwrap_or(0),
            )
        })
        .collect())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_create_request(req: &CreateJob) -> Result<(), JobError> {
    if req.prompt.trim().is_empty() {
        return Err(JobError::ValidationError(
            "prompt must not be empty".to_string(),
        ));
    }

    Ok(())
}
