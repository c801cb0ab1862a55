//! ID resolver module
//!
//! Handles resolution of UUID prefixes to full UUIDs by querying the API.
//! This allows users to specify short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use errand_client::ErrandClient;
use errand_core::dto::job::ListJobsQuery;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Number of records fetched when searching for a prefix
const RESOLVE_LIMIT: usize = 10_000;

/// Resolve a job ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches the job list and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(client: &ErrandClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    // If it's already a full UUID, return it
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let jobs = client
        .list_jobs(&ListJobsQuery {
            status_filter: None,
            limit: Some(RESOLVE_LIMIT),
        })
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|job| job.id), &id_or_prefix.as_str())
}

/// Pick the single id starting with `prefix` (case-insensitive)
fn match_prefix(ids: impl IntoIterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let prefix = prefix.to_lowercase();

    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
