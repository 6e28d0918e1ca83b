use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::services::storage::StorageError;

/// Request-level failures. Worker failures never reach this type; they are
/// folded into the recognition result instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Only image files are allowed!")]
    UnsupportedMediaType,

    #[error("Only one file may be uploaded")]
    TooManyFiles,

    #[error("File too large (limit is {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NoFile | AppError::TooManyFiles => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Multipart(e) => e.status(),
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Multipart(e) => e.body_text(),
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Failed to persist upload");
                "Failed to store uploaded file".to_string()
            }
            other => other.to_string(),
        };

        if status.is_client_error() {
            tracing::warn!(status = %status, error = %message, "Rejected upload");
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
