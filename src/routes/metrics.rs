use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the relay's metrics.
pub fn describe() {
    metrics::describe_counter!("recognition_jobs_total", "Recognition jobs submitted");
    metrics::describe_counter!(
        "recognition_jobs_completed",
        "Recognition jobs that produced a result without error"
    );
    metrics::describe_counter!(
        "recognition_jobs_failed",
        "Recognition jobs reported with an error (worker failure or timeout)"
    );
    metrics::describe_counter!(
        "recognition_jobs_timed_out",
        "Recognition jobs whose worker was killed at the deadline"
    );
    metrics::describe_counter!(
        "transient_cleanup_failures_total",
        "Uploaded files that could not be deleted"
    );
    metrics::describe_histogram!(
        "recognition_job_seconds",
        "Wall-clock time of one recognition job"
    );
}
