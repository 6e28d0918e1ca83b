//! Test helper utilities for driving the relay router in-process

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use sign_relay::app_state::AppState;
use sign_relay::build_router;
use sign_relay::config::AppConfig;
use sign_relay::services::relay::JobRelay;
use sign_relay::services::storage::TransientStore;
use sign_relay::services::worker::WorkerCommand;

pub const BOUNDARY: &str = "sign-relay-test-boundary";

/// One part of a hand-built multipart form.
pub struct FormPart<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub fn image(file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "image",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn recognize_request(parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/recognize-sign")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Scratch directories plus a shell-script worker for one test.
pub struct TestEnv {
    pub root: tempfile::TempDir,
    pub config: AppConfig,
    pub deadline: Duration,
}

impl TestEnv {
    /// `worker_body` is a shell script run as `sh worker.sh <image-path>`.
    pub fn new(worker_body: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let uploads = root.path().join("uploads");
        let static_dir = root.path().join("build");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::create_dir_all(&static_dir).unwrap();

        let script = root.path().join("worker.sh");
        std::fs::write(&script, worker_body).unwrap();

        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            gemini_api_key: "test-key".to_string(),
            worker_program: "sh".to_string(),
            worker_script: script.to_string_lossy().into_owned(),
            upload_dir: uploads,
            static_dir,
            ..AppConfig::default()
        };

        Self {
            root,
            config,
            deadline: Duration::from_secs(10),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.config.max_upload_bytes = limit;
        self
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.upload_dir.clone()
    }

    pub fn app(&self) -> Router {
        let store = TransientStore::new(self.config.upload_dir.clone());
        let worker = WorkerCommand::new(
            self.config.worker_program.clone(),
            self.config.worker_args(),
        );
        let relay = JobRelay::new(worker, self.deadline);
        build_router(AppState::new(self.config.clone(), store, relay), None)
    }

    /// Number of files left in the upload directory.
    pub fn leftover_uploads(&self) -> usize {
        std::fs::read_dir(&self.config.upload_dir).unwrap().count()
    }
}
