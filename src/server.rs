use std::io;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::routes;

/// Room for multipart boundaries and headers on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the full application: API routes, optional metrics endpoint, and the
/// built UI as fallback for every other path.
pub fn build_router(state: AppState, prometheus: Option<Arc<PrometheusHandle>>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config.frontend_url);

    let ui = ServeDir::new(&static_dir)
        .fallback(ServeFile::new(static_dir.join("index.html")));

    let mut app = Router::new()
        .route("/api/recognize-sign", post(routes::recognize::recognize_sign))
        .route("/api/status", get(routes::health::api_status))
        .route("/health", get(routes::health::health_check))
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(handle),
        );
    }

    app.fallback_service(ui)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);

    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin = %frontend_url, error = %e, "Invalid FRONTEND_URL, cross-origin requests disabled");
            layer
        }
    }
}

/// Bind `host:port`, falling back once to `host:port+1` if the port is taken.
pub async fn bind_with_fallback(host: &str, port: u16) -> io::Result<TcpListener> {
    match TcpListener::bind((host, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            let next = port.checked_add(1).ok_or(e)?;
            tracing::warn!(port, next, "Port is already in use, trying next port");
            TcpListener::bind((host, next)).await
        }
        Err(e) => Err(e),
    }
}
