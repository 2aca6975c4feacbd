use super::{Executor, ExecutorError, JobId};
use std::{
    ffi::OsString,
    io::Read,
    path::Path,
    process::{Command, Stdio},
    time::Duration,
};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Executor submitting job scripts with `sbatch`
#[derive(Debug, Clone)]
pub struct SlurmExecutor {
    sbatch: OsString,
    timeout: Duration,
}

impl Default for SlurmExecutor {
    fn default() -> Self {
        Self {
            sbatch: OsString::from("sbatch"),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SlurmExecutor {
    pub fn new(sbatch: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            sbatch: sbatch.into(),
            timeout,
        }
    }

    fn command_name(&self) -> String {
        self.sbatch.to_string_lossy().into_owned()
    }
}

impl Executor for SlurmExecutor {
    #[instrument(skip(self), level = "debug")]
    fn submit(&mut self, job_dir: &Path, script: &Path) -> Result<JobId, ExecutorError> {
        let mut child = Command::new(&self.sbatch)
            .arg("--parsable")
            .arg(script)
            .current_dir(job_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: self.command_name(),
                source,
            })?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                warn!("{} ran into timeout, killing it", self.command_name());
                child.kill()?;
                child.wait()?;

                return Err(ExecutorError::Timeout {
                    command: self.command_name(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let mut stdout = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_string(&mut stdout)?;
        }

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                pipe.read_to_string(&mut stderr)?;
            }

            return Err(ExecutorError::Failed {
                command: self.command_name(),
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("Output from {}: {stdout}", self.command_name());

        parse_job_id(&stdout).ok_or_else(|| ExecutorError::UnexpectedOutput {
            command: self.command_name(),
            output: stdout.trim().to_string(),
        })
    }
}

/// `sbatch --parsable` prints `<job id>[;<cluster>]`
fn parse_job_id(output: &str) -> Option<JobId> {
    output
        .trim()
        .split(';')
        .next()
        .and_then(|id| id.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, os::unix::fs::PermissionsExt, path::PathBuf};
    use tempfile::TempDir;

    fn fake_sbatch(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("sbatch");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn parses_parsable_output() {
        assert_eq!(parse_job_id("4242\n"), Some(4242));
        assert_eq!(parse_job_id("4242;daint\n"), Some(4242));
        assert_eq!(parse_job_id("Submitted batch job 4242"), None);
        assert_eq!(parse_job_id(""), None);
    }

    #[test]
    fn submits_inside_the_job_directory() {
        let dir = TempDir::new().unwrap();
        let sbatch = fake_sbatch(&dir, "pwd > submitted_from; echo 17");
        let job_dir = dir.path().join("4");
        fs::create_dir(&job_dir).unwrap();

        let mut executor = SlurmExecutor::new(sbatch, Duration::from_secs(10));
        let id = executor.submit(&job_dir, Path::new("job.sh")).unwrap();

        assert_eq!(id, 17);
        assert!(job_dir.join("submitted_from").is_file());
    }

    #[test]
    fn reports_failing_sbatch() {
        let dir = TempDir::new().unwrap();
        let sbatch = fake_sbatch(&dir, "echo 'invalid partition' >&2; exit 1");

        let mut executor = SlurmExecutor::new(sbatch, Duration::from_secs(10));
        let error = executor
            .submit(dir.path(), Path::new("job.sh"))
            .unwrap_err();

        match error {
            ExecutorError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "invalid partition");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_sbatch_fails_to_spawn() {
        let mut executor =
            SlurmExecutor::new("/nonexistent/sbatch", Duration::from_secs(1));

        assert!(matches!(
            executor.submit(Path::new("."), Path::new("job.sh")),
            Err(ExecutorError::Spawn { .. })
        ));
    }
}
