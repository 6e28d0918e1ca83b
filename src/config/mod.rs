use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Placeholder credential used when `GEMINI_API_KEY` is not set.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GEMINI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Interface to listen on.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port. The next port is tried once if this one is taken.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin of the UI allowed to make cross-origin requests
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Credential handed to the worker through its environment
    #[serde(default = "default_api_key")]
    pub gemini_api_key: String,

    /// Program launched for each recognition job (e.g. "python3")
    #[serde(default = "default_worker_program")]
    pub worker_program: String,

    /// Script passed to the worker program ahead of the image path.
    /// An empty value launches the program with the image path only.
    #[serde(default = "default_worker_script")]
    pub worker_script: String,

    /// Directory holding uploaded images while their job runs
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Built UI served for every non-API route
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Wall-clock deadline for one worker run, in seconds
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Maximum accepted image size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3005
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_key() -> String {
    PLACEHOLDER_API_KEY.to_string()
}

fn default_worker_program() -> String {
    "python3".to_string()
}

fn default_worker_script() -> String {
    "analyze_image.py".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_job_timeout_secs() -> u64 {
    30
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Arguments placed before the image path when launching the worker.
    pub fn worker_args(&self) -> Vec<String> {
        if self.worker_script.trim().is_empty() {
            Vec::new()
        } else {
            vec![self.worker_script.clone()]
        }
    }

    pub fn has_placeholder_credential(&self) -> bool {
        self.gemini_api_key == PLACEHOLDER_API_KEY
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: default_frontend_url(),
            gemini_api_key: default_api_key(),
            worker_program: default_worker_program(),
            worker_script: default_worker_script(),
            upload_dir: default_upload_dir(),
            static_dir: default_static_dir(),
            job_timeout_secs: default_job_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
