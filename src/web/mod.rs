//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::tailer::LogScanner;

use axum::{routing::get, Router};
use prometheus::Registry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Registry,
    pub scanner: Arc<LogScanner>,
}

/// HTTP server exposing the metrics endpoint.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, registry: Registry, scanner: Arc<LogScanner>) -> Self {
        Self {
            state: AppState {
                config,
                registry,
                scanner,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let metrics_path = self.state.config.metrics_path.as_str();
        let mut router = Router::new().route(metrics_path, get(handlers::handle_metrics));

        if metrics_path != "/" {
            router = router.route("/", get(handlers::handle_landing));
        }

        router
            .route("/api/state", get(handlers::handle_state))
            .route("/health", get(handlers::handle_health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = &self.state.config.listen_addr;
        let router = self.routes();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            "Web server listening on {}, metrics at {}",
            listener.local_addr()?,
            self.state.config.metrics_path
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraFilter;
    use crate::metrics::build_registry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    fn server(log_dir: &Path, metrics_path: &str) -> Server {
        let config = ServerConfig {
            metrics_path: metrics_path.to_string(),
            log_path: log_dir.to_path_buf(),
            ..Default::default()
        };
        let scanner = Arc::new(LogScanner::new(log_dir, CameraFilter::default()));
        let registry = build_registry(scanner.clone(), CameraFilter::default()).unwrap();
        Server::new(config, registry, scanner)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(server(dir.path(), "/metrics").routes(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_landing_links_metrics_path() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(server(dir.path(), "/scrape").routes(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/scrape\""));
    }

    #[tokio::test]
    async fn test_metrics_scrapes_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("20240101_BI.txt");
        fs::write(&log, "0 \t1/1/2024 10:00:00.000\tFront\tsignal: restored\n").unwrap();

        let server = server(dir.path(), "/metrics");

        // First scrape arms the cursor, the second folds the appended line.
        let (status, _) = get(server.routes(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);

        let mut contents = fs::read_to_string(&log).unwrap();
        contents.push_str("12.01.01 00:00:01  CAM1 AI: Alert person: 85% [zone][95]ms\n");
        fs::write(&log, contents).unwrap();

        let (status, body) = get(server.routes(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("blueiris_ai_count{camera=\"CAM1\",type=\"alert\"} 1"));
        assert!(body.contains("blueiris_exporter_errors{function=\"BlueIris\"} 0"));
        assert!(body.contains("blueiris_collector_duration_seconds"));
    }

    #[tokio::test]
    async fn test_metrics_reports_missing_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(server(dir.path(), "/metrics").routes(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("blueiris_exporter_errors{function=\"BlueIris\"} 1"));
        assert!(!body.contains("blueiris_ai_restarted"));
    }

    #[tokio::test]
    async fn test_state_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(server(dir.path(), "/metrics").routes(), "/api/state").await;
        assert_eq!(status, StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["snapshot"]["counters"]["restarted"], 0);
        assert_eq!(value["snapshot"]["parse_error_total"], 0);
        assert!(value["last_scan"].is_null());
        assert!(value["file"].is_null());
    }
}
