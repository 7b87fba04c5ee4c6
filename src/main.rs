//! Forex Engine - bounded multi-stage trade pipeline
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐
//! │ Producer │───▶│ Validator │───▶│ Enricher │───▶│ Settler │───▶│ Auditor │
//! └──────────┘    └───────────┘    └──────────┘    └─────────┘    └─────────┘
//!        bounded channels between stages, blocking push = backpressure
//! ```
//!
//! Starts the HTTP gateway; pipelines are started and stopped through it.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use forex_engine::config::AppConfig;
use forex_engine::gateway::{self, state::AppState};
use forex_engine::logging::init_logging;
use forex_engine::service::PipelineService;

#[derive(Debug, Parser)]
#[command(name = "forex_engine", version, about = "Bounded multi-stage forex trade pipeline")]
struct Cli {
    /// Config environment, loads config/{env}.yaml
    #[arg(short, long, default_value = "dev")]
    env: String,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(&cli.env).with_context(|| format!("loading config for env '{}'", cli.env))?;
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let _guard = init_logging(&config);
    info!(
        env = %cli.env,
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        "Forex Engine starting"
    );

    let service = Arc::new(PipelineService::new(&config.pipeline)?);
    let state = Arc::new(AppState::new(service.clone()));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    };

    gateway::run_server(&config.gateway, state, shutdown).await?;

    // Drain both pipelines before exit
    service.stop_alternate_pipeline().await?;
    let classic = service.clone();
    tokio::task::spawn_blocking(move || classic.stop_classic_pipeline()).await??;

    info!(status = ?service.status(), "Forex Engine stopped");
    Ok(())
}
