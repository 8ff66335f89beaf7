//! SparkLE GW - Arturia SparkLE drum-machine control surface
//!
//! Runs the router against the in-memory DAW binding and drives the
//! surface over MIDI until CTRL+C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sparkle_gw::config::AppConfig;
use sparkle_gw::daw::memory::MemoryDaw;
use sparkle_gw::router::Router;
use sparkle_gw::surface::SurfaceDriver;
use sparkle_gw::{cli, paths};

/// SparkLE Gateway - drive a drum machine from the Arturia SparkLE
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: sparkle.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting SparkLE GW v{}...", env!("CARGO_PKG_VERSION"));

    let config_path = paths::resolve_config_path(args.config.as_deref());
    info!("Configuration file: {}", config_path.display());
    let config = AppConfig::load(&config_path).await?;

    if args.list_ports {
        return cli::print_ports(&config);
    }

    let driver = Arc::new(SurfaceDriver::new(&config));
    let daw = Arc::new(MemoryDaw::new());
    let router = Router::new(daw, driver.clone(), &config);

    // Without the surface the router still runs, LED writes are dropped
    if let Err(e) = driver.connect(router.classifier()) {
        warn!("SparkLE not connected: {}", e);
    }

    router.start();
    info!("✅ SparkLE GW ready");

    shutdown_signal().await?;

    router.shutdown();
    driver.disconnect();

    info!("SparkLE GW shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to install CTRL+C signal handler")?;
    info!("Shutdown signal received");
    Ok(())
}
