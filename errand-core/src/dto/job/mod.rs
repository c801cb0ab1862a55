//! Job DTOs for the HTTP API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobMode, JobStatus};

/// Default number of records returned by a listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Request to submit a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub prompt: String,
    #[serde(default)]
    pub mode: JobMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl CreateJob {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: JobMode::default(),
            metadata: None,
        }
    }

    pub fn with_mode(mut self, mode: JobMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Query parameters for listing jobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ListJobsQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}
