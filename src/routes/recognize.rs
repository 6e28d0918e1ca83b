use axum::extract::{Multipart, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::recognition::RecognitionResult;
use crate::services::storage::TransientAsset;

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

/// POST /api/recognize-sign — classify one uploaded image.
///
/// Only request-shape problems are errors. Once an image is accepted the
/// response is always 200 with a `sign`, even when the worker fails.
pub async fn recognize_sign(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<RecognitionResult>> {
    tracing::info!("Received image recognition request");

    let limit = state.config.max_upload_bytes;
    let mut upload: Option<TransientAsset> = None;

    // An accepted upload is deleted by its guard if a later field is rejected.
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if upload.is_some() {
            return Err(AppError::TooManyFiles);
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::UnsupportedMediaType);
        }

        let data = field.bytes().await?;
        if data.len() > limit {
            return Err(AppError::PayloadTooLarge { limit });
        }

        upload = Some(state.store.persist(&file_name, &content_type, &data).await?);
    }

    let upload = upload.ok_or(AppError::NoFile)?;
    let result = state.relay.submit(upload, state.credential()).await;

    Ok(Json(result))
}
