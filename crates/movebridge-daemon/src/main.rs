//! movebridge Daemon - Main entry point
//!
//! Connects to the tracking service, registers the configured peripherals and
//! publishes their channels every tick until interrupted.

mod config;
mod host;

use anyhow::{Context, Result};
use clap::Parser;
use movebridge_core::{Bridge, FrameBuffer};
use movebridge_service::{connect_with_retries, SimulatedConnector};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "movebridge")]
#[command(about = "Bridge tracked motion peripherals onto indexed tracker/analog/button channels")]
#[command(version)]
struct Args {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "movebridge.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the device descriptor before the first tick
    #[arg(long)]
    debug: bool,

    /// Abort startup if any configured peripheral is rejected
    #[arg(long)]
    strict: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Write an example configuration to this path and exit
    #[arg(long)]
    write_default_config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("movebridge v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &args.write_default_config {
        config::save_default_config(path)?;
        info!(path = %path.display(), "Wrote example configuration");
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;
    config.debug |= args.debug;
    config.strict |= args.strict;
    config.validate()?;

    info!(
        controllers = config.controllers.len(),
        strict = config.strict,
        poll_delay_ms = config.tick.poll_delay_ms,
        "Configuration loaded"
    );

    let mut connector = SimulatedConnector::new(config.simulation.clone());
    let service = connect_with_retries(&mut connector, &config.service).await?;

    let mut sink = FrameBuffer::new();
    let mut bridge = Bridge::start_with_timeout(
        service,
        &config.controllers,
        config.policy(),
        config.service.timeout_ms,
        &mut sink,
    )
    .context("Failed to start bridge")?;

    // Printed regardless of log level
    if config.debug {
        println!("{}", bridge.manifest().descriptor_json(&config.device_name));
    }

    let settings = host::LoopSettings {
        summary_every: config.tick.summary_every,
        max_ticks: args.ticks,
        ..host::LoopSettings::from_millis(config.tick.poll_delay_ms)
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for interrupt, running until tick limit");
            std::future::pending::<()>().await;
        }
    };

    let outcome = host::run(&mut bridge, &mut sink, settings, shutdown).await;
    bridge.shutdown();

    let report = outcome?;
    info!(
        ticks = report.ticks,
        stale_ticks = report.stale_ticks,
        frames = sink.frames,
        "movebridge stopped"
    );
    Ok(())
}
