//! ## procam-cli
//! **Operator tooling for the pro-camera callback channel**
//!
//! Decodes captured messages, drives a seeded loopback session through both
//! ends of the channel, and prints the effective configuration.

use anyhow::Context;
use clap::Parser;
use procam_config::ProcamConfig;
use procam_telemetry::EventLogger;

mod commands;
mod event_source;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ProcamConfig::load_from_path(path),
        None => ProcamConfig::load(),
    }
    .context("loading configuration")?;

    EventLogger::init(&config.telemetry.log_filter)
        .map_err(|e| anyhow::anyhow!(e))
        .context("initialising logging")?;

    match cli.command {
        Commands::Inspect(args) => commands::inspect(&config, &args),
        Commands::Loopback(args) => commands::run_loopback(&config, args).await,
        Commands::Config => commands::show_config(&config),
    }
}
