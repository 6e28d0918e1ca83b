use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use sign_relay::app_state::AppState;
use sign_relay::config::AppConfig;
use sign_relay::routes;
use sign_relay::{bind_with_fallback, build_router};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing sign-relay server");

    if config.has_placeholder_credential() {
        tracing::warn!("GEMINI_API_KEY is not set, the worker will receive a placeholder key");
    }

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    routes::metrics::describe();

    let state = AppState::from_config(config.clone());

    state
        .store
        .ensure_dir()
        .await
        .expect("Failed to create uploads directory");

    tracing::info!(
        program = %config.worker_program,
        script = %config.worker_script,
        timeout_secs = config.job_timeout_secs,
        "Worker configured"
    );

    let app = build_router(state, Some(Arc::new(prometheus_handle)));

    let listener = bind_with_fallback(&config.host, config.port)
        .await
        .expect("Failed to bind to address");

    let addr = listener.local_addr().expect("Listener has no local address");
    tracing::info!("Server listening on {}", addr);
    tracing::info!("API server URL: http://localhost:{}/api/recognize-sign", addr.port());

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
