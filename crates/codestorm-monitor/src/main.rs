//! # CodeStorm Monitor
//!
//! Operator console for the CodeStorm realtime channel.
//!
//! ## Usage
//!
//! ```bash
//! # Run with a config file from the default locations
//! codestorm-monitor
//!
//! # Run with a specific config file
//! codestorm-monitor /path/to/codestorm.toml
//!
//! # Print the effective configuration and exit
//! codestorm-monitor --print-config
//!
//! # Override settings from the environment
//! CODESTORM_SESSION__USER_ID=judge-2 CODESTORM_CHANNEL__ORIGIN=http://10.0.0.5:3000 codestorm-monitor
//! ```

mod config;
mod metrics;
mod monitor;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codestorm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut print_config = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--print-config" => print_config = true,
            _ => path = Some(PathBuf::from(arg)),
        }
    }

    let config = config::MonitorConfig::load(path.as_deref())?;

    if print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    tracing::info!(
        origin = %config.channel.origin,
        contest = ?config.session.contest_id,
        "Starting CodeStorm monitor"
    );

    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            tracing::error!(error = %e, "Failed to start metrics exporter");
        }
    }

    monitor::run(config).await
}
