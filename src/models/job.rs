use serde::Serialize;

/// How a worker run ended. A job is running until it reaches one of these.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    TimedOut,
}

/// Terminal outcome of a worker run. Exactly one variant is produced per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The worker exited on its own before the deadline.
    Completed {
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The deadline fired first and the worker was killed. Its output is discarded.
    TimedOut,
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::TimedOut => JobStatus::TimedOut,
        }
    }
}
