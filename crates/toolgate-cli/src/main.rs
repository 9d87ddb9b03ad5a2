//! Toolgate admin CLI entry point.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use toolgate_exec::MockExecutor;
use toolgate_gateway::{Gateway, GatewayConfig};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };

    init_tracing(&config.logging.level);

    // The CLI ships with the mock executor; a deployment wires a real
    // transport behind the same trait.
    let gateway = Gateway::from_config(&config, Arc::new(MockExecutor::new()))
        .context("assembling gateway")?;

    commands::run(&gateway, args.command).await
}

/// Initialize tracing from `RUST_LOG`, falling back to the configured
/// level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
