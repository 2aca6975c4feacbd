mod slurm;

pub use slurm::SlurmExecutor;

use std::path::Path;
use thiserror::Error;

pub type JobId = u64;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to spawn {command}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} did not finish within {seconds}s")]
    Timeout { command: String, seconds: u64 },
    #[error("{command} exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Unexpected output from {command}: '{output}'")]
    UnexpectedOutput { command: String, output: String },
    #[error("Failed to wait for a child proccess")]
    ChildError(#[from] std::io::Error),
}

/// Hands a generated job script to a batch scheduler
pub trait Executor {
    /// submit `script` with `job_dir` as working directory
    fn submit(&mut self, job_dir: &Path, script: &Path) -> Result<JobId, ExecutorError>;
}
