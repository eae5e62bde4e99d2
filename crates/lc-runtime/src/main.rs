//! # Lightcone Gateway
//!
//! Serves the demo catalog over REST, RPC, event-stream and action routes.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log filter fallback when `RUST_LOG` is unset
const LOG_LEVEL_ENV: &str = "LC_LOG_LEVEL";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_LEVEL_ENV))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(version = lc_gateway::VERSION, "Starting Lightcone gateway");

    let config = lc_runtime::load_config().context("loading configuration")?;
    let mut service = lc_runtime::build_service(config).context("building gateway")?;
    let addr = service.start().await.context("starting gateway")?;
    info!(%addr, "Ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    service.shutdown().await.context("stopping gateway")?;
    Ok(())
}
