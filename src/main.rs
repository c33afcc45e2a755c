//! Monitoring demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ request-id → logging → recovery → metrics ─┬─▶ /healthz, /readyz, /metrics
//!                                                               │
//!                                                               └─▶ /api/v1
//!                                                                     ├─▶ fault injection → ping, work
//!                                                                     └─▶ bearer auth → toggles/error-rate,
//!                                                                                       toggles/readiness
//!
//!     Shared state: ErrorToggle, HealthRegistry, MetricsRegistry, WorkSimulator
//!     Lifecycle:    SIGTERM/SIGINT → stop accept → drain in-flight work → flush → exit
//! ```

use clap::Parser;
use std::path::PathBuf;

use monitoring_demo::config;
use monitoring_demo::http::middleware::install_panic_hook;
use monitoring_demo::lifecycle::{self, shutdown_signal, DrainOutcome};
use monitoring_demo::observability::logging;

#[derive(Parser)]
#[command(name = "monitoring-demo")]
#[command(about = "HTTP service with probes, metrics and fault injection", long_about = None)]
struct Args {
    /// Path to a TOML config file. Falls back to $APP_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var_os("APP_CONFIG").map(PathBuf::from));

    let config = config::load(config_path.as_deref())?;
    logging::init(&config.observability)?;
    install_panic_hook();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.observability.environment,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "Configuration loaded"
    );

    let started = lifecycle::bind(config).await?;
    let coordinator = started.server.shutdown_coordinator();

    tokio::spawn(coordinator.trigger_on(async {
        if let Err(err) = shutdown_signal().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signals, shutting down");
        }
    }));

    match started.server.run(started.listener).await? {
        DrainOutcome::Drained { waited } => {
            tracing::info!(waited = ?waited, "Shutdown complete");
        }
        DrainOutcome::TimedOut { remaining } => {
            tracing::warn!(remaining, "Shutdown complete after drain timeout");
        }
    }
    Ok(())
}
