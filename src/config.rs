//! Configuration module for the Blue Iris exporter.
//!
//! Defaults, then environment variables, then command-line flags.

use clap::Parser;
use std::env;
use std::path::PathBuf;

/// Command-line flags. Anything left unset falls back to the environment.
#[derive(Debug, Default, Parser)]
#[command(name = "blueiris_exporter", version, about = "Prometheus exporter for Blue Iris logs")]
pub struct Args {
    /// Comma-separated list of camera short names
    #[arg(long)]
    pub cameras: Option<String>,
    /// Address on which to expose metrics
    #[arg(long = "telemetry.addr")]
    pub listen_addr: Option<String>,
    /// URL path for surfacing collected metrics
    #[arg(long = "telemetry.path")]
    pub metrics_path: Option<String>,
    /// Directory path to the Blue Iris logs
    #[arg(long = "logpath")]
    pub log_path: Option<PathBuf>,
}

/// Cameras whose series are exposed. Empty means every camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraFilter(Vec<String>);

impl CameraFilter {
    /// Parse a comma-separated camera list.
    pub fn parse(list: &str) -> Self {
        Self(
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn allows(&self, camera: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|c| c.eq_ignore_ascii_case(camera))
    }

    pub fn cameras(&self) -> &[String] {
        &self.0
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on (default: "0.0.0.0:2112")
    pub listen_addr: String,
    /// Path serving the metrics (default: "/metrics")
    pub metrics_path: String,
    /// Directory holding the Blue Iris log files
    pub log_path: PathBuf,
    pub cameras: CameraFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:2112".to_string(),
            metrics_path: "/metrics".to_string(),
            log_path: PathBuf::from(r"C:\BlueIris\log\"),
            cameras: CameraFilter::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and flags.
    ///
    /// Environment variables:
    /// - `BLUEIRIS_LISTEN_ADDR`: listen address (default: 0.0.0.0:2112)
    /// - `BLUEIRIS_METRICS_PATH`: metrics path (default: /metrics)
    /// - `BLUEIRIS_LOG_PATH`: log directory (default: C:\BlueIris\log\)
    /// - `BLUEIRIS_CAMERAS`: comma-separated camera filter
    pub fn load(args: Args) -> Self {
        let mut cfg = Self::default();

        if let Ok(addr) = env::var("BLUEIRIS_LISTEN_ADDR") {
            cfg.listen_addr = normalize_listen_addr(&addr);
        }
        if let Ok(path) = env::var("BLUEIRIS_METRICS_PATH") {
            cfg.metrics_path = normalize_metrics_path(&path);
        }
        if let Ok(path) = env::var("BLUEIRIS_LOG_PATH") {
            cfg.log_path = PathBuf::from(path);
        }
        if let Ok(cameras) = env::var("BLUEIRIS_CAMERAS") {
            cfg.cameras = CameraFilter::parse(&cameras);
        }

        cfg.apply(args);
        cfg
    }

    /// Override settings with any flags that were given.
    pub fn apply(&mut self, args: Args) {
        if let Some(addr) = args.listen_addr {
            self.listen_addr = normalize_listen_addr(&addr);
        }
        if let Some(path) = args.metrics_path {
            self.metrics_path = normalize_metrics_path(&path);
        }
        if let Some(path) = args.log_path {
            self.log_path = path;
        }
        if let Some(cameras) = args.cameras {
            self.cameras = CameraFilter::parse(&cameras);
        }
    }
}

/// Accept `2112`, `:2112` or a full `host:port`.
fn normalize_listen_addr(addr: &str) -> String {
    let addr = addr.trim();
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if addr.contains(':') {
        addr.to_string()
    } else {
        format!("0.0.0.0:{}", addr)
    }
}

/// Paths served by other routes; the metrics endpoint may not shadow them.
const RESERVED_PATHS: [&str; 2] = ["/health", "/api/state"];

fn normalize_metrics_path(path: &str) -> String {
    let path = path.trim();
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if RESERVED_PATHS.contains(&path.as_str()) {
        tracing::warn!("Metrics path {} is already served, using /metrics", path);
        return "/metrics".to_string();
    }
    path
}
