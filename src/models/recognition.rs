use serde::{Deserialize, Serialize};

/// Label reported when no classification is available.
pub const UNKNOWN_SIGN: &str = "Unknown";

/// Label reported when the worker missed its deadline.
pub const UNKNOWN_TIMEOUT_SIGN: &str = "Unknown (timeout)";

pub const TIMEOUT_ERROR: &str = "Processing timed out";

/// Body of `POST /api/recognize-sign`. A label is always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognitionResult {
    pub sign: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl RecognitionResult {
    pub fn recognized(sign: impl Into<String>) -> Self {
        Self {
            sign: sign.into(),
            error: None,
        }
    }

    /// Worker ran but produced no usable label.
    pub fn unknown() -> Self {
        Self::recognized(UNKNOWN_SIGN)
    }

    /// Worker failed; `detail` is reported alongside the sentinel label.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            sign: UNKNOWN_SIGN.to_string(),
            error: Some(detail.into()),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            sign: UNKNOWN_TIMEOUT_SIGN.to_string(),
            error: Some(TIMEOUT_ERROR.to_string()),
        }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}
