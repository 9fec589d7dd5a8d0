//! Launchpad GW
//!
//! Bridge between a Novation Launchpad and OBS Studio (obs-websocket).

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_gw::bridge::Bridge;
use launchpad_gw::config::AppConfig;
use launchpad_gw::remote::{MirrorHandle, ObsConnector};
use launchpad_gw::surface::launchpad::discovery;
use launchpad_gw::surface::LaunchpadDevice;

/// Launchpad Gateway - Drive OBS scenes, transitions, mutes and streaming from a Launchpad
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

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

    info!("Starting Launchpad GW v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load_or_default(&args.config).await?;

    if args.list_ports {
        discovery::list_ports_formatted(&config.surface.port_pattern);
        return Ok(());
    }

    run_app(config, shutdown_signal()).await?;

    info!("Launchpad GW shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let mut launchpad = LaunchpadDevice::new(config.surface.port_pattern.clone());
    if let Err(e) = launchpad.connect() {
        warn!("⚠️  Launchpad not available, running without surface: {:#}", e);
    }
    let input = launchpad
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Launchpad input receiver already taken"))?;

    let connector = Arc::new(ObsConnector::from_config(&config.obs));
    let mirror = MirrorHandle::spawn(connector, config.obs.reconnect_delay());
    let events = mirror.subscribe();
    mirror.connect();

    info!("Ready to process Launchpad and OBS events!");

    Bridge::new(&launchpad, mirror.clone(), events, input)
        .run(shutdown)
        .await;

    info!("Shutting down...");
    mirror.disconnect();
    // Wait for the actor to process the disconnect
    mirror.snapshot().await;
    launchpad.disconnect();

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

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

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
