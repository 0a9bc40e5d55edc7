//! Audient bootstrap binary.
//!
//! Loads configuration, starts the audit worker and keeps it running until
//! interrupted. Traffic events arrive from the interception layer through
//! the client handle.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audient_engine::{AuditClient, AuditConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1).map(|s| s.as_str()) {
        Some("--config") => {
            let path = args
                .get(2)
                .context("--config requires a path to a YAML file")?;
            AuditConfig::load(path).with_context(|| format!("Failed to load config: {}", path))?
        }
        Some(other) => anyhow::bail!("Unknown argument: {}", other),
        None => AuditConfig::default(),
    };

    if config.policy_path.is_none() {
        info!("No policy file configured; compliance checking is disabled");
    }
    info!(
        "Watching {} LLM hosts with {} worker(s)",
        config.llm_hosts.len(),
        config.num_workers
    );

    let client = AuditClient::start(config)
        .await
        .context("Failed to start the audit worker")?;
    info!("Audient is running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");
    client.shutdown().await?;
    Ok(())
}
