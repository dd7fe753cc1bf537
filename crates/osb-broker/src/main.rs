//! osbd - Open Service Broker daemon
//!
//! Serves the broker API and runs the reconciliation controller that
//! completes asynchronous provisioning.

use clap::Parser;
use osb_broker::{BrokerConfig, DaemonError, DaemonResult, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Broker daemon CLI
#[derive(Parser)]
#[command(name = "osbd")]
#[command(about = "Open Service Broker daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "OSB_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "OSB_LISTEN_ADDR")]
    listen: Option<String>,

    /// Path the broker API is mounted under
    #[arg(long, env = "OSB_URL_PREFIX")]
    url_prefix: Option<String>,

    /// Log level
    #[arg(long, env = "OSB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "OSB_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = BrokerConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(prefix) = cli.url_prefix {
        config.server.url_prefix = prefix;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.log_json {
        config.logging.json = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
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

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        resync_secs = config.controller.resync_interval_secs,
        "Starting osbd"
    );

    let server = Server::new(config)?;
    server.run().await
}
