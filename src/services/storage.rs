//! Transient storage for uploaded images.
//!
//! Each upload is written under a unique name and owned by a
//! [`TransientAsset`] guard that deletes it when the job ends.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;

use crate::models::asset::UploadedAsset;

/// Local directory holding uploaded images while their job runs.
///
/// Shared by all in-flight jobs. Every upload gets its own file name, so no
/// locking is needed.
pub struct TransientStore {
    dir: PathBuf,
}

impl TransientStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            tracing::info!(dir = %self.dir.display(), "Creating uploads directory");
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Io {
                path: self.dir.clone(),
                source: e,
            })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write uploaded bytes to a fresh transient file.
    ///
    /// The returned guard owns the file; dropping it or calling
    /// [`TransientAsset::release`] deletes it.
    pub async fn persist(
        &self,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<TransientAsset, StorageError> {
        let file_name = unique_file_name(original_name);
        let path = self.dir.join(&file_name);

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StorageError::Io {
                path: path.clone(),
                source: e,
            })?;

        tracing::info!(
            file = %file_name,
            size = data.len(),
            content_type = %content_type,
            "Persisted uploaded image"
        );

        Ok(TransientAsset {
            asset: UploadedAsset {
                file_name,
                path,
                content_type: content_type.to_string(),
                size: data.len(),
            },
            released: false,
        })
    }
}

/// Exclusive handle on one uploaded file.
///
/// Release is best-effort: failures are logged and counted, never returned.
/// If the guard is dropped without an explicit release (an early return or a
/// panicking task), the file is removed synchronously in `Drop`.
#[derive(Debug)]
pub struct TransientAsset {
    asset: UploadedAsset,
    released: bool,
}

impl TransientAsset {
    pub fn asset(&self) -> &UploadedAsset {
        &self.asset
    }

    pub fn path(&self) -> &Path {
        &self.asset.path
    }

    /// Delete the file. Returns whether the deletion succeeded.
    pub async fn release(mut self) -> bool {
        self.released = true;
        match tokio::fs::remove_file(&self.asset.path).await {
            Ok(()) => {
                tracing::info!(path = %self.asset.path.display(), "Deleted temp file");
                true
            }
            Err(e) => {
                log_release_failure(&self.asset.path, &e);
                false
            }
        }
    }
}

impl Drop for TransientAsset {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.asset.path) {
            Ok(()) => {
                tracing::debug!(path = %self.asset.path.display(), "Deleted temp file on drop")
            }
            Err(e) => log_release_failure(&self.asset.path, &e),
        }
    }
}

fn log_release_failure(path: &Path, err: &std::io::Error) {
    metrics::counter!("transient_cleanup_failures_total").increment(1);
    tracing::error!(path = %path.display(), error = %err, "Error deleting file");
}

/// `<unix-millis>-<random 0..1e9>-<sanitized original name>`.
pub fn unique_file_name(original_name: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        suffix,
        sanitize_file_name(original_name)
    )
}

/// Keep only the final path component, restricted to `[A-Za-z0-9._-]`.
fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
