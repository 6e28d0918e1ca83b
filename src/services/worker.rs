//! External worker process management.
//!
//! A [`WorkerCommand`] launches one process per job with the image path as its
//! last argument and the credential in its environment, streams stdout and
//! stderr into job-local buffers, and races process exit against a deadline.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::models::job::JobOutcome;
use crate::services::extraction::{SectionLine, SectionTracker};

/// Environment variable carrying the credential into the worker.
pub const CREDENTIAL_ENV_VAR: &str = "GEMINI_API_KEY";

/// Maximum stdout or stderr captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Longest single read held in memory; longer lines are split.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Consecutive read errors tolerated before a stream is abandoned.
const MAX_READ_ERRORS: u32 = 8;

/// How to launch the worker: a program plus leading arguments.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: String,
    args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the worker against `image_path` and wait for exactly one terminal outcome.
    ///
    /// On timeout the process is killed and reaped in the background; the
    /// caller does not wait for it to disappear.
    pub async fn run(
        &self,
        image_path: &Path,
        credential: &str,
        deadline: Duration,
    ) -> Result<JobOutcome, WorkerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(image_path)
            .env(CREDENTIAL_ENV_VAR, credential)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| WorkerError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        let pid = child.id();
        tracing::info!(program = %self.program, pid = ?pid, "Worker started");

        let mut stdout_task = spawn_reader(child.stdout.take(), StreamKind::Stdout);
        let mut stderr_task = spawn_reader(child.stderr.take(), StreamKind::Stderr);

        // Exit counts once the process is gone and both streams are drained,
        // all within the same deadline.
        let finished = async {
            let status = child.wait().await?;
            let stdout = (&mut stdout_task).await.unwrap_or_default();
            let stderr = (&mut stderr_task).await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };

        tokio::select! {
            finished = finished => {
                let (status, stdout, stderr) = finished.map_err(WorkerError::Wait)?;

                tracing::info!(
                    pid = ?pid,
                    exit_code = ?status.code(),
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    "Worker exited"
                );

                Ok(JobOutcome::Completed {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            _ = tokio::time::sleep(deadline) => {
                tracing::error!(pid = ?pid, timeout_secs = deadline.as_secs_f64(), "Worker timed out");
                stdout_task.abort();
                stderr_task.abort();
                terminate(child);
                Ok(JobOutcome::TimedOut)
            }
        }
    }
}

/// Send a kill and reap the process without blocking the caller.
fn terminate(mut child: Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to signal worker");
    }
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => tracing::debug!(status = %status, "Killed worker reaped"),
            Err(e) => tracing::warn!(error = %e, "Failed to reap killed worker"),
        }
    });
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Accumulate a stream line by line, logging each line as it arrives.
///
/// Lines are read as raw bytes and decoded lossily, so invalid UTF-8 never
/// stops the capture. Lines longer than [`MAX_LINE_BYTES`] are split. The
/// stream is drained to EOF even after the capture limit is reached, so the
/// worker never sees a closed pipe.
fn spawn_reader<R>(handle: Option<R>, kind: StreamKind) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = String::new();
        let Some(handle) = handle else {
            return buf;
        };

        let mut reader = BufReader::new(handle);
        let mut raw = Vec::with_capacity(1024);
        let mut section = SectionTracker::default();
        let mut truncated = false;
        let mut errors = 0;

        loop {
            raw.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut raw)
                .await;
            match read {
                Ok(0) => break,
                Ok(_) => errors = 0,
                Err(e) => {
                    tracing::warn!(stream = ?kind, error = %e, "Error reading worker output");
                    errors += 1;
                    if errors >= MAX_READ_ERRORS {
                        break;
                    }
                    continue;
                }
            }

            let newline = raw.last() == Some(&b'\n');
            let mut end = raw.len();
            if newline {
                end -= 1;
                if end > 0 && raw[end - 1] == b'\r' {
                    end -= 1;
                }
            }
            let line = String::from_utf8_lossy(&raw[..end]);

            match kind {
                StreamKind::Stdout => match section.classify(&line) {
                    SectionLine::Start => tracing::info!("Worker result section begins"),
                    SectionLine::End => tracing::info!("Worker result section ends"),
                    SectionLine::Inside => tracing::info!(line = %line, "Worker result"),
                    SectionLine::Outside => tracing::debug!(line = %line, "Worker stdout"),
                },
                StreamKind::Stderr => tracing::warn!(line = %line, "Worker stderr"),
            }

            if truncated || buf.len() + line.len() + 1 > MAX_OUTPUT_BYTES {
                if !truncated {
                    tracing::warn!(stream = ?kind, "Worker output truncated");
                    truncated = true;
                }
                continue;
            }
            buf.push_str(&line);
            if newline {
                buf.push('\n');
            }
        }
        buf
    })
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to start worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for worker: {0}")]
    Wait(#[source] std::io::Error),
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use crate::services::extraction::extract_label;

    /// Write `body` as a shell script and return a command that runs it with `sh`.
    fn script_worker(dir: &Path, body: &str) -> WorkerCommand {
        let script = dir.join("worker.sh");
        std::fs::write(&script, body).expect("write script");
        WorkerCommand::new("sh", vec![script.to_string_lossy().into_owned()])
    }

    fn image(dir: &Path) -> PathBuf {
        let path = dir.join("image.jpg");
        std::fs::write(&path, b"jpeg").expect("write image");
        path
    }

    #[tokio::test]
    async fn test_captures_both_streams_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(dir.path(), "echo out-line\necho err-line >&2\nexit 3\n");

        let outcome = worker
            .run(&image(dir.path()), "key", Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                exit_code: Some(3),
                stdout: "out-line\n".to_string(),
                stderr: "err-line\n".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_stop_capture() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(
            dir.path(),
            "printf 'caf\\351 debug\\n'\n\
             echo '=== RESULT START ==='\n\
             echo '🔍 Gemini says: Stop'\n\
             echo '=== RESULT END ==='\n\
             printf 'bad \\377 err\\n' >&2\n",
        );

        let outcome = worker
            .run(&image(dir.path()), "key", Duration::from_secs(10))
            .await
            .unwrap();

        let JobOutcome::Completed { exit_code, stdout, stderr } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(exit_code, Some(0));
        assert!(stdout.starts_with("caf\u{FFFD} debug\n"), "stdout: {stdout:?}");
        assert_eq!(extract_label(&stdout).as_deref(), Some("Stop"));
        assert_eq!(stderr, "bad \u{FFFD} err\n");
    }

    #[tokio::test]
    async fn test_long_line_is_split_without_losing_later_output() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(
            dir.path(),
            "head -c 200000 /dev/zero | tr '\\0' a\n\
             echo\n\
             echo '🔍 Gemini says: Yield'\n",
        );

        let outcome = worker
            .run(&image(dir.path()), "key", Duration::from_secs(10))
            .await
            .unwrap();

        let JobOutcome::Completed { stdout, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(stdout.matches('a').count(), 200_000 + 1);
        assert_eq!(extract_label(&stdout).as_deref(), Some("Yield"));
    }

    #[tokio::test]
    async fn test_capture_is_capped_and_stream_drained() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(
            dir.path(),
            "head -c 12000000 /dev/zero | tr '\\0' a\n\
             echo\n\
             echo done >&2\n",
        );

        let outcome = worker
            .run(&image(dir.path()), "key", Duration::from_secs(30))
            .await
            .unwrap();

        let JobOutcome::Completed { exit_code, stdout, stderr } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(exit_code, Some(0));
        assert!(stdout.len() <= MAX_OUTPUT_BYTES);
        assert!(stdout.len() >= MAX_OUTPUT_BYTES - MAX_LINE_BYTES);
        assert_eq!(stderr, "done\n");
    }

    #[tokio::test]
    async fn test_passes_image_path_and_credential() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(dir.path(), "echo \"$1\"\necho \"$GEMINI_API_KEY\"\n");
        let image = image(dir.path());

        let outcome = worker
            .run(&image, "s3cret", Duration::from_secs(10))
            .await
            .unwrap();

        let JobOutcome::Completed { stdout, exit_code, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(exit_code, Some(0));
        assert_eq!(stdout, format!("{}\ns3cret\n", image.display()));
    }

    #[tokio::test]
    async fn test_deadline_kills_hung_worker() {
        let dir = tempfile::tempdir().unwrap();
        let worker = script_worker(dir.path(), "echo started\nexec sleep 1000\n");

        let started = std::time::Instant::now();
        let outcome = worker
            .run(&image(dir.path()), "key", Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let worker = WorkerCommand::new("/nonexistent/worker-binary", Vec::new());

        let err = worker
            .run(&image(dir.path()), "key", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Spawn { .. }));
    }
}
