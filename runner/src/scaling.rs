use crate::{
    executors::{Executor, ExecutorError},
    miniapps::{CommandContext, Lib, Miniapp, MiniappError, RunParams, SizeParams},
    systems::System,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const JOB_SCRIPT: &str = "job.sh";
pub const DEFAULT_SUFFIX: &str = "na";

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid run: {0}")]
    Miniapp(#[from] MiniappError),
    #[error("Invalid run of {miniapp}: {reason}")]
    InvalidRun { miniapp: Miniapp, reason: String },
    #[error("A plan needs at least one node count, node counts must be positive and unique")]
    InvalidNodes,
    #[error("Job script {0} already exists, refusing to overwrite it")]
    JobExists(PathBuf),
    #[error("Failed to write job to {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to submit {path}")]
    Submit {
        path: PathBuf,
        source: ExecutorError,
    },
}

/// One configured benchmark invocation within a plan
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    pub miniapp: Miniapp,
    pub lib: Lib,
    pub build_dir: PathBuf,
    pub params: RunParams,
    pub size: SizeParams,
    // sizes are rounded to the nearest multiple of approx (weak scaling only)
    #[serde(default = "default_approx")]
    pub approx: u64,
    pub nruns: u32,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub extra_flags: String,
    #[serde(default)]
    pub env: String,
}

fn default_approx() -> u64 {
    512
}

fn default_suffix() -> String {
    String::from(DEFAULT_SUFFIX)
}

impl RunSpec {
    pub fn new(
        miniapp: Miniapp,
        lib: Lib,
        build_dir: impl Into<PathBuf>,
        params: RunParams,
        size: SizeParams,
        approx: u64,
        nruns: u32,
    ) -> Self {
        Self {
            miniapp,
            lib,
            build_dir: build_dir.into(),
            params,
            size,
            approx,
            nruns,
            suffix: default_suffix(),
            extra_flags: String::new(),
            env: String::new(),
        }
    }

    /// distinguish runs of the same miniapp and library, ends up in the output file name
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn extra_flags(mut self, flags: &str) -> Self {
        self.extra_flags = flags.to_string();
        self
    }

    /// variable assignments prepended to the launcher line
    pub fn env(mut self, env: &str) -> Self {
        self.env = env.to_string();
        self
    }

    /// validate the run against a system
    pub fn check(&self, system: &System) -> Result<(), PlanError> {
        self.miniapp.validate(self.lib, &self.params)?;

        if !system.allows_rpn(self.params.rpn) {
            return Err(MiniappError::UnsupportedRpn {
                system: system.name.clone(),
                rpn: self.params.rpn,
                allowed: system.allowed_rpns.clone(),
            }
            .into());
        }

        let reason = if self.nruns == 0 {
            Some("nruns must be positive")
        } else if self.approx == 0 {
            Some("approx must be positive")
        } else if self.size.m_sz == 0 {
            Some("m_sz must be positive")
        } else if self.suffix.is_empty() || self.suffix.contains(['_', '/']) {
            Some("suffix must be non empty and must not contain '_' or '/'")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PlanError::InvalidRun {
                miniapp: self.miniapp,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn command(&self, system: &System, nodes: u32, m_sz: u64) -> Result<String, PlanError> {
        Ok(self.miniapp.command(&CommandContext {
            system,
            lib: self.lib,
            build_dir: &self.build_dir,
            nodes,
            params: &self.params,
            m_sz,
            nruns: self.nruns,
            suffix: &self.suffix,
            extra_flags: &self.extra_flags,
            env: &self.env,
        })?)
    }
}

/// size for `nodes` nodes keeping the memory per node constant, rounded to a multiple of approx
pub fn weak_size(m_sz: u64, nodes: u32, approx: u64) -> u64 {
    let scaled = m_sz as f64 * f64::from(nodes).sqrt() / approx as f64;
    (scaled.round() as u64).max(1) * approx
}

/// format minutes as a slurm time limit, rounding up to whole minutes
pub fn format_time(minutes: f64) -> String {
    let minutes = minutes.max(0.0).ceil() as u64;
    format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
}

/// expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Behaviour shared by all scaling plans, a job is generated for each node count
pub trait JobPlan {
    fn system(&self) -> &System;
    fn run_name(&self) -> &str;
    fn job_name(&self) -> &str;
    fn nodes(&self) -> &[u32];
    fn runs(&self) -> &[RunSpec];

    /// wall clock budget in minutes for the job on `nodes` nodes
    fn job_time(&self, nodes: u32) -> f64;

    /// matrix size a run uses on `nodes` nodes
    fn matrix_size(&self, run: &RunSpec, nodes: u32) -> u64;

    fn job_time_str(&self, nodes: u32) -> String {
        format_time(self.job_time(nodes))
    }

    /// complete batch script for `nodes` nodes
    fn job_text(&self, nodes: u32) -> Result<String, PlanError> {
        let mut text = self.system().render_preamble(
            self.run_name(),
            self.job_name(),
            nodes,
            &self.job_time_str(nodes),
        );

        for run in self.runs() {
            let command = run.command(self.system(), nodes, self.matrix_size(run, nodes))?;
            debug!(nodes = nodes, "{command}");

            text.push_str(&command);
            text.push('\n');
        }

        Ok(text)
    }

    /// Write one job script per node count below `run_dir` and submit them unless `debug` is set
    #[instrument(skip(self, executor, debug), fields(run = self.run_name()))]
    fn submit(
        &self,
        run_dir: &Path,
        debug: bool,
        executor: &mut dyn Executor,
    ) -> Result<Vec<PathBuf>, PlanError> {
        if self.nodes().is_empty()
            || self.nodes().contains(&0)
            || !self.nodes().iter().all_unique()
        {
            return Err(PlanError::InvalidNodes);
        }

        let run_dir = expand_tilde(run_dir);

        // render everything first to not leave half a run behind on invalid runs
        let jobs = self
            .nodes()
            .iter()
            .map(|&nodes| -> Result<(u32, String), PlanError> {
                Ok((nodes, self.job_text(nodes)?))
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        if let Some(script) = self
            .nodes()
            .iter()
            .map(|nodes| run_dir.join(nodes.to_string()).join(JOB_SCRIPT))
            .find(|script| script.exists())
        {
            return Err(PlanError::JobExists(script));
        }

        let mut scripts = Vec::with_capacity(jobs.len());

        for (nodes, text) in jobs {
            let job_dir = run_dir.join(nodes.to_string());
            let script = job_dir.join(JOB_SCRIPT);

            fs::create_dir_all(&job_dir).map_err(|source| PlanError::Io {
                path: job_dir.clone(),
                source,
            })?;
            fs::write(&script, text).map_err(|source| PlanError::Io {
                path: script.clone(),
                source,
            })?;

            if debug {
                info!(script = ?script, "Created job script, skipping submission");
            } else {
                let id = executor
                    .submit(&job_dir, Path::new(JOB_SCRIPT))
                    .map_err(|source| PlanError::Submit {
                        path: script.clone(),
                        source,
                    })?;

                info!(script = ?script, job_id = id, "Submitted job");
            }

            scripts.push(script);
        }

        Ok(scripts)
    }
}

/// Weak scaling plan, matrix sizes grow with the number of nodes
#[derive(Debug, Clone)]
pub struct WeakScaling {
    system: System,
    run_name: String,
    job_name: String,
    nodes: Vec<u32>,
    time0: f64,
    time: f64,
    runs: Vec<RunSpec>,
}

impl WeakScaling {
    /// job time is `time0 + sqrt(nodes) * time` minutes
    pub fn new(
        system: &System,
        run_name: &str,
        job_name: &str,
        nodes: &[u32],
        time0: f64,
        time: f64,
    ) -> Self {
        Self {
            system: system.clone(),
            run_name: run_name.to_string(),
            job_name: job_name.to_string(),
            nodes: nodes.to_vec(),
            time0,
            time,
            runs: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        miniapp: Miniapp,
        lib: Lib,
        build_dir: impl Into<PathBuf>,
        params: RunParams,
        size: SizeParams,
        approx: u64,
        nruns: u32,
    ) -> Result<&mut Self, PlanError> {
        self.push(RunSpec::new(
            miniapp, lib, build_dir, params, size, approx, nruns,
        ))
    }

    pub fn push(&mut self, run: RunSpec) -> Result<&mut Self, PlanError> {
        run.check(&self.system)?;
        self.runs.push(run);

        Ok(self)
    }
}

impl JobPlan for WeakScaling {
    fn system(&self) -> &System {
        &self.system
    }

    fn run_name(&self) -> &str {
        &self.run_name
    }

    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn nodes(&self) -> &[u32] {
        &self.nodes
    }

    fn runs(&self) -> &[RunSpec] {
        &self.runs
    }

    fn job_time(&self, nodes: u32) -> f64 {
        self.time0 + f64::from(nodes).sqrt() * self.time
    }

    fn matrix_size(&self, run: &RunSpec, nodes: u32) -> u64 {
        weak_size(run.size.m_sz, nodes, run.approx)
    }
}

/// Strong scaling plan, matrix sizes are the same for every node count
#[derive(Debug, Clone)]
pub struct StrongScaling {
    system: System,
    run_name: String,
    job_name: String,
    nodes: Vec<u32>,
    time: f64,
    runs: Vec<RunSpec>,
}

impl StrongScaling {
    pub fn new(system: &System, run_name: &str, job_name: &str, nodes: &[u32], time: f64) -> Self {
        Self {
            system: system.clone(),
            run_name: run_name.to_string(),
            job_name: job_name.to_string(),
            nodes: nodes.to_vec(),
            time,
            runs: Vec::new(),
        }
    }

    pub fn add(
        &mut self,
        miniapp: Miniapp,
        lib: Lib,
        build_dir: impl Into<PathBuf>,
        params: RunParams,
        size: SizeParams,
        nruns: u32,
    ) -> Result<&mut Self, PlanError> {
        self.push(RunSpec::new(
            miniapp,
            lib,
            build_dir,
            params,
            size,
            default_approx(),
            nruns,
        ))
    }

    pub fn push(&mut self, run: RunSpec) -> Result<&mut Self, PlanError> {
        run.check(&self.system)?;
        self.runs.push(run);

        Ok(self)
    }
}

impl JobPlan for StrongScaling {
    fn system(&self) -> &System {
        &self.system
    }

    fn run_name(&self) -> &str {
        &self.run_name
    }

    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn nodes(&self) -> &[u32] {
        &self.nodes
    }

    fn runs(&self) -> &[RunSpec] {
        &self.runs
    }

    fn job_time(&self, _nodes: u32) -> f64 {
        self.time
    }

    fn matrix_size(&self, run: &RunSpec, _nodes: u32) -> u64 {
        run.size.m_sz
    }
}

/// Either kind of plan, as loaded from a plan file
#[derive(Debug, Clone)]
pub enum Plan {
    Weak(WeakScaling),
    Strong(StrongScaling),
}

impl Plan {
    pub fn push(&mut self, run: RunSpec) -> Result<(), PlanError> {
        match self {
            Self::Weak(plan) => plan.push(run).map(|_| ()),
            Self::Strong(plan) => plan.push(run).map(|_| ()),
        }
    }

    pub fn as_job_plan(&self) -> &dyn JobPlan {
        match self {
            Self::Weak(plan) => plan,
            Self::Strong(plan) => plan,
        }
    }
}
