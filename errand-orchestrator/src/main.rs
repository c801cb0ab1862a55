//! Errand Orchestrator binary
//!
//! Loads configuration, wires the registry, executor and engine together
//! and serves the HTTP API until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use errand_orchestrator::api;
use errand_orchestrator::config::Config;
use errand_orchestrator::engine::CommandEngineFactory;
use errand_orchestrator::repository::{InMemoryJobRepository, JobRepository};
use errand_orchestrator::scheduler::JobExecutor;
use errand_orchestrator::state::AppState;
use errand_orchestrator::workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "errand_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Errand Orchestrator...");

    let config = load_config()?;
    info!(
        "Loaded configuration: workspace_dir={}, max_concurrent_jobs={}, engine={:?}",
        config.workspace_dir.display(),
        config.max_concurrent_jobs,
        config.engine_command
    );

    let workspace = Workspace::open(&config.workspace_dir).with_context(|| {
        format!(
            "Failed to prepare workspace directory {}",
            config.workspace_dir.display()
        )
    })?;
    info!("Workspace root: {}", workspace.root().display());

    let jobs: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    warn!("Job registry is in memory; records are lost on restart");

    let engines = Arc::new(CommandEngineFactory::new(config.engine_command.clone())?);
    let executor = JobExecutor::new(
        jobs.clone(),
        engines,
        workspace.clone(),
        config.max_concurrent_jobs,
    );

    // Build router with all API endpoints
    let app = api::create_router(AppState::new(jobs, executor, workspace));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Waits for Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
