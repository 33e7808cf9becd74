//! Blue Iris Exporter
//!
//! Prometheus exporter tailing the Blue Iris log directory.

mod config;
mod metrics;
mod parser;
mod state;
mod tailer;
mod web;

use clap::Parser;
use config::{Args, ServerConfig};
use tailer::LogScanner;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("blueiris_exporter=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load(Args::parse());
    tracing::info!("Starting blueiris_exporter on {}...", cfg.listen_addr);
    tracing::info!("Reading Blue Iris logs from {}", cfg.log_path.display());
    if !cfg.cameras.cameras().is_empty() {
        tracing::info!("Exposing cameras: {}", cfg.cameras.cameras().join(", "));
    }

    let scanner = Arc::new(LogScanner::new(&cfg.log_path, cfg.cameras.clone()));
    let registry = metrics::build_registry(scanner.clone(), cfg.cameras.clone())?;

    let server = Server::new(cfg, registry, scanner);
    server.start().await?;

    Ok(())
}
