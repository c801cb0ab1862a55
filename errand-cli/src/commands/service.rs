//! Service command handlers

use anyhow::{Context, Result};
use colored::*;
use errand_client::ErrandClient;

/// Check that the orchestrator answers
pub async fn health(client: &ErrandClient) -> Result<()> {
    let health = client
        .health()
        .await
        .with_context(|| format!("Orchestrator at {} is unreachable", client.base_url()))?;

    println!(
        "{} {} (version {})",
        "✓".green(),
        health.status.green().bold(),
        health.version
    );
    println!(
        "  Server time: {}",
        health
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );

    Ok(())
}

/// Show executor load and job counts per status
pub async fn stats(client: &ErrandClient) -> Result<()> {
    let stats = client.stats().await?;

    println!("{}", "Executor:".bold());
    println!("  Slots:    {}", stats.executor.max_concurrent_jobs);
    println!("  Running:  {}", stats.executor.running.to_string().cyan());
    println!("  Backlog:  {}", stats.executor.backlog.to_string().yellow());

    println!("\n{}", "Jobs:".bold());
    for (status, count) in &stats.jobs {
        println!("  {:<10}{}", status, count);
    }

    Ok(())
}
