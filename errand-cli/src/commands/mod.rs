//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod service;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use errand_client::ErrandClient;
use errand_core::domain::job::{JobMode, JobStatus};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a new job
    Submit {
        /// Prompt handed to the engine
        prompt: String,

        /// Execution mode (direct, flow, mcp)
        #[arg(short, long, default_value = "direct")]
        mode: JobMode,

        /// Metadata as key=value pairs; values are parsed as JSON when possible
        #[arg(long = "meta", value_parser = job::parse_meta)]
        meta: Vec<(String, serde_json::Value)>,

        /// Wait until the job completes or fails
        #[arg(short, long)]
        wait: bool,

        /// Seconds to wait before giving up (with --wait)
        #[arg(long, default_value = "600")]
        timeout: u64,
    },
    /// Get job details
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Only show jobs in this status
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Maximum number of jobs to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete a job's record
    Delete {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Download a file produced by a job
    Download {
        /// Job ID or unambiguous prefix
        id: String,

        /// File path as listed by `get`, or relative to the job's directory
        path: String,

        /// Where to write the file (defaults to its name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check orchestrator health
    Health,
    /// Show executor load and job counts
    Stats,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = ErrandClient::new(&config.url);

    match command {
        Commands::Submit {
            prompt,
            mode,
            meta,
            wait,
            timeout,
        } => job::submit_job(&client, prompt, mode, meta, wait, timeout).await,
        Commands::Get { id } => job::get_job(&client, &id).await,
        Commands::List { status, limit } => job::list_jobs(&client, status, limit).await,
        Commands::Delete { id } => job::delete_job(&client, &id).await,
        Commands::Download { id, path, output } => {
            job::download_file(&client, &id, &path, output).await
        }
        Commands::Health => service::health(&client).await,
        Commands::Stats => service::stats(&client).await,
    }
}
