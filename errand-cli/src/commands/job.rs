//! Job command handlers
//!
//! Handles submitting, listing, inspecting and deleting jobs, and
//! downloading their artifacts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use errand_client::ErrandClient;
use errand_core::domain::job::{Job, JobMode, JobStatus};
use errand_core::dto::job::{CreateJob, ListJobsQuery};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Parse a single key=value metadata pair
///
/// The value is read as JSON when it parses (`priority=2`, `tags=["a"]`) and
/// kept as a plain string otherwise.
pub fn parse_meta(s: &str) -> Result<(String, JsonValue)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;

    if key.is_empty() {
        anyhow::bail!("invalid KEY=value: empty key in `{}`", s);
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Submit a job, optionally waiting for its outcome
pub async fn submit_job(
    client: &ErrandClient,
    prompt: String,
    mode: JobMode,
    meta: Vec<(String, JsonValue)>,
    wait: bool,
    timeout: u64,
) -> Result<()> {
    let mut req = CreateJob::new(prompt).with_mode(mode);
    if !meta.is_empty() {
        req = req.with_metadata(meta.into_iter().collect::<HashMap<_, _>>());
    }

    let job = client.submit_job(req).await?;

    println!("{}", "✓ Job submitted".green().bold());
    println!("  ID:     {}", job.id.to_string().cyan());
    println!("  Mode:   {}", job.mode);
    println!("  Status: {}", colorize_status(job.status));

    if !wait {
        return Ok(());
    }

    println!("{}", "Waiting for the job to finish...".dimmed());
    let job = client
        .wait_for_job(job.id, POLL_INTERVAL, Duration::from_secs(timeout))
        .await?;

    println!();
    print_job_details(&job);

    if job.status == JobStatus::Failed {
        anyhow::bail!("job {} failed", job.id);
    }

    Ok(())
}

/// Get and display a single job
pub async fn get_job(client: &ErrandClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

/// List jobs newest first
pub async fn list_jobs(
    client: &ErrandClient,
    status: Option<JobStatus>,
    limit: Option<usize>,
) -> Result<()> {
    let jobs = client
        .list_jobs(&ListJobsQuery {
            status_filter: status,
            limit,
        })
        .await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Delete a job's record
pub async fn delete_job(client: &ErrandClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    client.delete_job(uuid).await?;

    println!("{} Job {} deleted", "✓".green(), uuid.to_string().cyan());

    Ok(())
}

/// Download an artifact to disk
pub async fn download_file(
    client: &ErrandClient,
    id: &str,
    path: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let path = artifact_path(uuid, path);

    let bytes = client
        .download_file(uuid, &path)
        .await
        .with_context(|| format!("Failed to download {}", path))?;

    let output = output.unwrap_or_else(|| default_output(&path));
    tokio::fs::write(&output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} Saved {} ({} bytes)",
        "✓".green(),
        output.display().to_string().cyan(),
        bytes.len()
    );

    Ok(())
}

/// Artifact paths are relative to the workspace root; accept paths relative
/// to the job's directory too
fn artifact_path(job_id: Uuid, path: &str) -> String {
    let prefix = format!("{}/", job_id);
    if path.starts_with(&prefix) {
        path.to_string()
    } else {
        format!("{}{}", prefix, path.trim_start_matches('/'))
    }
}

fn default_output(path: &str) -> PathBuf {
    let name = path.rsplit('/').next().unwrap_or(path);
    PathBuf::from(if name.is_empty() { "download" } else { name })
}

/// Print a job summary line
fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Status:   {}", colorize_status(job.status));
    println!("    Mode:     {}", job.mode);
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!("    Prompt:   {}", truncate(&job.prompt, 60));
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Status:      {}", colorize_status(job.status));
    println!("  Mode:        {}", job.mode);
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    println!("\n{}", "Prompt:".bold());
    println!("  {}", job.prompt);

    if !job.metadata.is_empty() {
        println!("\n{}", "Metadata:".bold());
        for (key, value) in &job.metadata {
            println!("  {} = {}", key.cyan(), value);
        }
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        println!("  {}", result.green());
    }

    if let Some(files) = &job.files {
        println!("\n{}", "Files:".bold());
        if files.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for file in files {
            println!("  {}", file);
        }
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars || line.len() < text.len() {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
