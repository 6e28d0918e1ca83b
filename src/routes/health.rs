use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::recognition::StatusResponse;

/// GET /api/status — liveness probe used by the UI.
pub async fn api_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API is running".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub upload_dir: ComponentHealth,
    pub worker: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            detail: None,
        }
    }

    fn error(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// GET /health — readiness of the upload directory and worker configuration.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let upload_dir = match tokio::fs::metadata(state.store.dir()).await {
        Ok(meta) if !meta.is_dir() => ComponentHealth::error("not a directory"),
        Ok(meta) if meta.permissions().readonly() => ComponentHealth::error("read-only"),
        Ok(_) => ComponentHealth::ok(),
        Err(e) => ComponentHealth::error(e.to_string()),
    };

    let worker = if state.config.worker_program.trim().is_empty() {
        ComponentHealth::error("no worker program configured")
    } else {
        ComponentHealth::ok()
    };

    let all_healthy = upload_dir.is_ok() && worker.is_ok();
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { upload_dir, worker },
    };

    (status_code, Json(response))
}
