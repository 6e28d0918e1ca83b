//! Recognition job lifecycle.
//!
//! [`JobRelay::submit`] runs the worker against one transient upload, releases
//! the upload, and folds the job's terminal outcome into a
//! [`RecognitionResult`].

use std::time::{Duration, Instant};

use crate::models::job::JobOutcome;
use crate::models::recognition::RecognitionResult;
use crate::services::extraction::extract_label;
use crate::services::storage::TransientAsset;
use crate::services::worker::WorkerCommand;

/// Turns one persisted upload into one [`RecognitionResult`].
///
/// Each call is a single attempt with its own process, buffers and timer.
/// Worker failures and timeouts are reported in the result, never returned
/// as errors, and the transient file is released on every path.
pub struct JobRelay {
    worker: WorkerCommand,
    deadline: Duration,
}

impl JobRelay {
    pub fn new(worker: WorkerCommand, deadline: Duration) -> Self {
        Self { worker, deadline }
    }

    pub fn worker(&self) -> &WorkerCommand {
        &self.worker
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn submit(&self, asset: TransientAsset, credential: &str) -> RecognitionResult {
        metrics::counter!("recognition_jobs_total").increment(1);
        let started = Instant::now();

        tracing::info!(file = %asset.asset().file_name, "Starting recognition job");
        let outcome = self.worker.run(asset.path(), credential, self.deadline).await;

        asset.release().await;

        let result = match outcome {
            Ok(outcome) => {
                tracing::info!(status = ?outcome.status(), "Job finished");
                interpret(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker could not be run");
                RecognitionResult::failed(e.to_string())
            }
        };

        if result.error.is_some() {
            metrics::counter!("recognition_jobs_failed").increment(1);
        } else {
            metrics::counter!("recognition_jobs_completed").increment(1);
        }
        metrics::histogram!("recognition_job_seconds").record(started.elapsed().as_secs_f64());

        tracing::info!(sign = %result.sign, error = ?result.error, "Identified sign");
        result
    }
}

/// Map the single terminal outcome of a job onto the caller-facing result.
///
/// A non-zero exit or any stderr output is a failure, with the trimmed stderr
/// as the error detail. When a failed worker wrote nothing to stderr, the
/// detail names the exit code (or signal) instead of being left empty.
pub fn interpret(outcome: JobOutcome) -> RecognitionResult {
    match outcome {
        JobOutcome::TimedOut => {
            metrics::counter!("recognition_jobs_timed_out").increment(1);
            RecognitionResult::timed_out()
        }
        JobOutcome::Completed {
            exit_code,
            stdout,
            stderr,
        } => {
            if exit_code != Some(0) || !stderr.is_empty() {
                tracing::error!(exit_code = ?exit_code, stderr = %stderr, "Worker error");
                let detail = stderr.trim_end();
                if detail.is_empty() {
                    return RecognitionResult::failed(exit_detail(exit_code));
                }
                return RecognitionResult::failed(detail);
            }
            match extract_label(&stdout) {
                Some(label) => RecognitionResult::recognized(label),
                None => RecognitionResult::unknown(),
            }
        }
    }
}

fn exit_detail(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("Worker exited with code {code}"),
        None => "Worker was terminated by a signal".to_string(),
    }
}
