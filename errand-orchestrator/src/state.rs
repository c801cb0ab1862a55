//! Shared application state
//!
//! Everything a handler needs is owned here and injected into the router;
//! there is no global registry.

use std::sync::Arc;

use crate::repository::JobRepository;
use crate::scheduler::JobExecutor;
use crate::workspace::Workspace;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobRepository>,
    pub executor: JobExecutor,
    pub workspace: Workspace,
}

impl AppState {
    pub fn new(jobs: Arc<dyn JobRepository>, executor: JobExecutor, workspace: Workspace) -> Self {
        Self {
            jobs,
            executor,
            workspace,
        }
    }
}
