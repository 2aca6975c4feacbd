use crate::{
    config::{ConfigErrors, PlanConfig},
    executors::Executor,
    plans,
    scaling::{Plan, PlanError},
    systems::{self, SystemError},
};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Run weak scaling benchmarks.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Don't submit jobs, only create job scripts instead.
    #[arg(long)]
    pub debug: bool,

    /// Read the plan from a YAML plan file instead of using the built-in DLA-Future plan
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the job scripts are written to, one sub directory per node count
    #[arg(long)]
    pub run_dir: Option<PathBuf>,

    /// Name of the system to generate jobs for
    #[arg(long)]
    pub system: Option<String>,

    /// DLA-Future build directory used by the built-in plan
    #[arg(long)]
    pub dlaf_path: Option<PathBuf>,

    /// Seconds to wait for sbatch before giving up
    #[arg(long, default_value_t = 60)]
    pub sbatch_timeout: u64,
}

/// Build the requested plan, write its job scripts and submit them unless `--debug` is given
pub fn run(args: &Args, executor: &mut dyn Executor) -> Result<Vec<PathBuf>, RunnerError> {
    let (plan, run_dir) = match &args.config {
        Some(path) => {
            if args.dlaf_path.is_some() {
                warn!("--dlaf-path only applies to the built-in plan, ignoring it");
            }

            let mut config = PlanConfig::load(path)?;
            if let Some(system) = &args.system {
                config.system = system.clone();
            }

            let run_dir = args.run_dir.clone().unwrap_or_else(|| config.run_dir.clone());

            (config.build()?, run_dir)
        }
        None => {
            let system = systems::cscs(args.system.as_deref().unwrap_or(plans::SYSTEM))?;
            let dlaf_path = args
                .dlaf_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(plans::DLAF_PATH));
            let run_dir = args
                .run_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(plans::RUN_DIR));

            (Plan::Weak(plans::dlaf_weak(system, &dlaf_path)?), run_dir)
        }
    };

    let plan = plan.as_job_plan();
    info!(
        run = plan.run_name(),
        runs = plan.runs().len(),
        nodes = ?plan.nodes(),
        "Generating jobs"
    );

    Ok(plan.submit(&run_dir, args.debug, executor)?)
}
