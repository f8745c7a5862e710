//! Mela Daemon - marketplace backend service
//!
//! The daemon provides:
//! - REST API for auth, catalog, bookings, orders, and rentals
//! - The provider-driven booking lifecycle with completion codes
//! - Payment reconciliation against the gateway (sync and webhook paths)
//! - Best-effort SMS notifications

use clap::Parser;
use mela_daemon::config::DaemonConfig;
use mela_daemon::error::{DaemonError, DaemonResult};
use mela_daemon::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mela Daemon CLI
#[derive(Parser)]
#[command(name = "melad")]
#[command(about = "Mela Daemon - local services marketplace backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MELA_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(
        short,
        long,
        env = "MELA_LISTEN_ADDR",
        default_value = "127.0.0.1:8080"
    )]
    listen: String,

    /// Log level
    #[arg(long, env = "MELA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "MELA_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    config.server.listen_addr = cli
        .listen
        .parse()
        .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;

    // Print startup banner
    println!(
        r#"
  __  __      _
 |  \/  | ___| | __ _
 | |\/| |/ _ \ |/ _` |
 | |  | |  __/ | (_| |
 |_|  |_|\___|_|\__,_|

  Mela - local services marketplace
  Version: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
