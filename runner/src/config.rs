use crate::{
    scaling::{Plan, PlanError, RunSpec, StrongScaling, WeakScaling},
    systems::{self, System, SystemError},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use itertools::Itertools;
use tracing::error;

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read plan file {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Plan file is not valid")]
    Deserialize(#[from] serde_yaml::Error),
    #[error("Plan failed the preflight checks, see the log for details")]
    Preflight,
    #[error("System lookup failed")]
    System(#[from] SystemError),
    #[error("Plan could not be built")]
    Plan(#[from] PlanError),
}

/// Plan file describing a scaling run
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    // name of the system, looked up in `systems` first and in the CSCS registry after
    pub system: String,
    // additional systems, shadowing built-in ones with the same name
    #[serde(default)]
    pub systems: BTreeMap<String, System>,
    pub run_name: String,
    pub job_name: String,
    pub nodes: Vec<u32>,
    pub run_dir: PathBuf,
    pub scaling: ScalingConfig,
    pub runs: Vec<RunSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum ScalingConfig {
    /// job time is `time0 + sqrt(nodes) * time` minutes
    Weak { time0: f64, time: f64 },
    /// constant job time in minutes
    Strong { time: f64 },
}

impl PlanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// resolve the configured system
    pub fn resolve_system(&self) -> Result<System, SystemError> {
        match self.systems.get(&self.system) {
            Some(system) => {
                let mut system = system.clone();
                if system.name.is_empty() {
                    system.name = self.system.clone();
                }

                Ok(system)
            }
            None => systems::cscs(&self.system).cloned(),
        }
    }

    /// Check the whole plan, logging every problem instead of stopping at the first one.
    /// Returns true if an error was found.
    pub fn preflight_checks(&mut self) -> bool {
        let mut contains_error = false;

        if self.nodes.is_empty() {
            error!("nodes is empty, unable to generate any job");
            contains_error = true;
        }

        if self.nodes.contains(&0) {
            error!("nodes contains 0, every job needs at least one node");
            contains_error = true;
        }

        let duplicates = self.nodes.iter().duplicates().join(", ");
        if !duplicates.is_empty() {
            error!("nodes contains {duplicates} more than once, every node count gets a single job");
            contains_error = true;
        }

        if self.runs.is_empty() {
            error!("No run was defined, the generated jobs would be empty");
            contains_error = true;
        }

        match &self.scaling {
            ScalingConfig::Weak { time0, time } if *time0 < 0.0 || *time < 0.0 => {
                error!("scaling.time0 and scaling.time must not be negative");
                contains_error = true;
            }
            ScalingConfig::Strong { time } if *time <= 0.0 => {
                error!("scaling.time must be positive");
                contains_error = true;
            }
            _ => {}
        }

        match self.resolve_system() {
            Ok(system) => {
                for (index, run) in self.runs.iter().enumerate() {
                    if let Err(e) = run.check(&system) {
                        error!("runs[{index}] ({}): {e}", run.miniapp);
                        contains_error = true;
                    }
                }
            }
            Err(e) => {
                error!("system: {e}");
                contains_error = true;
            }
        }

        contains_error
    }

    /// Build the plan described by this config
    pub fn build(&mut self) -> Result<Plan, ConfigErrors> {
        if self.preflight_checks() {
            return Err(ConfigErrors::Preflight);
        }

        let system = self.resolve_system()?;
        let mut plan = match self.scaling {
            ScalingConfig::Weak { time0, time } => Plan::Weak(WeakScaling::new(
                &system,
                &self.run_name,
                &self.job_name,
                &self.nodes,
                time0,
                time,
            )),
            ScalingConfig::Strong { time } => Plan::Strong(StrongScaling::new(
                &system,
                &self.run_name,
                &self.job_name,
                &self.nodes,
                time,
            )),
        };

        for run in self.runs.iter() {
            plan.push(run.clone())?;
        }

        Ok(plan)
    }
}
