//! Job-related API endpoints

use std::time::Duration;

use errand_core::domain::job::Job;
use errand_core::dto::job::{CreateJob, ListJobsQuery};
use uuid::Uuid;

use crate::ErrandClient;
use crate::error::{ClientError, Result};

impl ErrandClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Submit a new job
    ///
    /// The returned record is `pending`; execution happens in the background.
    ///
    /// # Example
    /// ```no_run
    /// # use errand_client::ErrandClient;
    /// # use errand_core::domain::job::JobMode;
    /// # use errand_core::dto::job::CreateJob;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = ErrandClient::new("http://localhost:8000");
    /// let job = client
    ///     .submit_job(CreateJob::new("say hi").with_mode(JobMode::Flow))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_job(&self, req: CreateJob) -> Result<Job> {
        let url = self.endpoint(["tasks"])?;
        let response = self.client.post(url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = self.endpoint(["tasks", &job_id.to_string()])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// List jobs newest first, optionally filtered by status
    pub async fn list_jobs(&self, query: &ListJobsQuery) -> Result<Vec<Job>> {
        let url = self.endpoint(["tasks"])?;
        let response = self.client.get(url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// Delete a job's record
    pub async fn delete_job(&self, job_id: Uuid) -> Result<()> {
        let url = self.endpoint(["tasks", &job_id.to_string()])?;
        let response = self.client.delete(url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Poll a job until it reaches `completed` or `failed`
    ///
    /// Gives up with [`ClientError::Timeout`] once `timeout` has elapsed.
    pub async fn wait_for_job(
        &self,
        job_id: Uuid,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Job> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self.get_job(job_id).await?;
            if job.is_terminal() {
                return Ok(job);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::Timeout(format!(
                    "job {} still {} after {:?}",
                    job_id, job.status, timeout
                )));
            }

            tracing::debug!("Job {} is {}, polling again", job_id, job.status);
            tokio::time::sleep(poll_interval).await;
        }
    }

    // =============================================================================
    // Artifacts
    // =============================================================================

    /// Download a file produced by a job
    ///
    /// `path` is relative to the workspace root, exactly as listed in the
    /// job's `files` (e.g. `"<job id>/report.md"`).
    pub async fn download_file(&self, job_id: Uuid, path: &str) -> Result<Vec<u8>> {
        self.download_file_raw(&job_id.to_string(), path).await
    }

    /// Download with an unvalidated job id segment
    pub async fn download_file_raw(&self, job_id: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(["tasks", job_id, "files", path])?;
        let response = self.client.get(url).send().await?;

        self.handle_bytes_response(response).await
    }
}
