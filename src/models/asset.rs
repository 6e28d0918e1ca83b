use std::path::PathBuf;

/// One uploaded image, persisted to the upload directory for the lifetime of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// `<unix-millis>-<random>-<original name>`; unique per upload.
    pub file_name: String,
    pub path: PathBuf,
    pub content_type: String,
    pub size: usize,
}
