use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{relay::JobRelay, storage::TransientStore, worker::WorkerCommand};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<TransientStore>,
    pub relay: Arc<JobRelay>,
}

impl AppState {
    pub fn new(config: AppConfig, store: TransientStore, relay: JobRelay) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            relay: Arc::new(relay),
        }
    }

    /// Wire the store and relay from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let store = TransientStore::new(config.upload_dir.clone());
        let worker = WorkerCommand::new(config.worker_program.clone(), config.worker_args());
        let relay = JobRelay::new(worker, config.job_timeout());
        Self::new(config, store, relay)
    }

    /// Credential for the next worker launch.
    pub fn credential(&self) -> &str {
        &self.config.gemini_api_key
    }
}
