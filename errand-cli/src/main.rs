//! Errand CLI
//!
//! Command-line interface for submitting jobs to the Errand orchestrator
//! and fetching what they produced.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "errand")]
#[command(about = "Errand job execution CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "ERRAND_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config { url: cli.url };

    handle_command(cli.command, &config).await
}
