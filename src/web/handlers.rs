//! HTTP request handlers.

use super::AppState;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use prometheus::{Encoder, TextEncoder};

const LANDING_TEMPLATE: &str = r#"<html>
<head><title>Blue Iris Exporter</title></head>
<body>
<h1>Blue Iris Exporter</h1>
<p><a href="{{metrics_path}}">Metrics</a></p>
<p><a href="/api/state">State</a></p>
</body>
</html>
"#;

pub async fn handle_landing(State(state): State<AppState>) -> impl IntoResponse {
    Html(LANDING_TEMPLATE.replace("{{metrics_path}}", &state.config.metrics_path))
}

/// Gather the registry, which scans the log once, and encode it as text.
pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        let families = registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map(|_| buffer)
    })
    .await;

    match encoded {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Ok(Err(e)) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("Metrics task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Current aggregate state as JSON. Does not scan.
pub async fn handle_state(State(state): State<AppState>) -> Response {
    let scanner = state.scanner.clone();
    match tokio::task::spawn_blocking(move || scanner.status()).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_health() -> &'static str {
    "ok"
}
