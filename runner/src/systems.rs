use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error("Unknown system '{name}', known systems are: {known}")]
    UnknownSystem { name: String, known: String },
}

/// Description of a cluster partition jobs are generated for
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct System {
    #[serde(default)]
    pub name: String,
    pub cores: u32,
    pub threads_per_core: u32,
    pub allowed_rpns: Vec<u32>,
    // launcher used for multi rank jobs
    #[serde(default = "default_launcher")]
    pub launcher: String,
    #[serde(default)]
    pub gpu: bool,
    // batch script header, supports {run_name}, {job_name}, {nodes} and {time}
    pub batch_preamble: String,
}

impl System {
    /// Fill the placeholders of the batch preamble for a single job
    pub fn render_preamble(&self, run_name: &str, job_name: &str, nodes: u32, time: &str) -> String {
        self.batch_preamble
            .replace("{run_name}", run_name)
            .replace("{job_name}", job_name)
            .replace("{nodes}", &nodes.to_string())
            .replace("{time}", time)
    }

    pub fn allows_rpn(&self, rpn: u32) -> bool {
        rpn > 0 && self.allowed_rpns.contains(&rpn)
    }
}

fn default_launcher() -> String {
    String::from("srun")
}

const DAINT_MC_PREAMBLE: &str = "#!/bin/bash -l
#SBATCH --job-name={job_name}_{nodes}
#SBATCH --time={time}
#SBATCH --nodes={nodes}
#SBATCH --partition=normal
#SBATCH --constraint=mc
#SBATCH --hint=multithread
#SBATCH --output=output.txt
#SBATCH --error=error.txt

# Env
export MPICH_MAX_THREAD_SAFETY=multiple
export MIMALLOC_EAGER_COMMIT_DELAY=0
export MIMALLOC_LARGE_OS_PAGES=1

# Commands
";

const DAINT_GPU_PREAMBLE: &str = "#!/bin/bash -l
#SBATCH --job-name={job_name}_{nodes}
#SBATCH --time={time}
#SBATCH --nodes={nodes}
#SBATCH --partition=normal
#SBATCH --constraint=gpu
#SBATCH --hint=multithread
#SBATCH --output=output.txt
#SBATCH --error=error.txt

# Env
export MPICH_MAX_THREAD_SAFETY=multiple
export MIMALLOC_EAGER_COMMIT_DELAY=0
export MIMALLOC_LARGE_OS_PAGES=1
export CRAY_CUDA_MPS=0

# Commands
";

const EIGER_PREAMBLE: &str = "#!/bin/bash -l
#SBATCH --job-name={job_name}_{nodes}
#SBATCH --time={time}
#SBATCH --nodes={nodes}
#SBATCH --partition=normal
#SBATCH --constraint=mc
#SBATCH --hint=multithread
#SBATCH --output=output.txt
#SBATCH --error=error.txt

# Env
export MPICH_MAX_THREAD_SAFETY=multiple
export MIMALLOC_EAGER_COMMIT_DELAY=0
export MIMALLOC_LARGE_OS_PAGES=1

# Commands
";

/// Systems available at CSCS, keyed by `<cluster>-<partition>`
pub static CSCS: Lazy<BTreeMap<&'static str, System>> = Lazy::new(|| {
    let mut systems = BTreeMap::new();

    systems.insert(
        "daint-mc",
        System {
            name: String::from("daint-mc"),
            cores: 36,
            threads_per_core: 2,
            allowed_rpns: vec![1, 2, 4],
            launcher: default_launcher(),
            gpu: false,
            batch_preamble: String::from(DAINT_MC_PREAMBLE),
        },
    );
    systems.insert(
        "daint-gpu",
        System {
            name: String::from("daint-gpu"),
            cores: 12,
            threads_per_core: 2,
            allowed_rpns: vec![1],
            launcher: default_launcher(),
            gpu: true,
            batch_preamble: String::from(DAINT_GPU_PREAMBLE),
        },
    );
    systems.insert(
        "eiger",
        System {
            name: String::from("eiger"),
            cores: 128,
            threads_per_core: 2,
            allowed_rpns: vec![1, 2, 4, 8],
            launcher: default_launcher(),
            gpu: false,
            batch_preamble: String::from(EIGER_PREAMBLE),
        },
    );

    systems
});

/// look up a built-in CSCS system
pub fn cscs(name: &str) -> Result<&'static System, SystemError> {
    CSCS.get(name).ok_or_else(|| SystemError::UnknownSystem {
        name: name.to_string(),
        known: CSCS.keys().join(", "),
    })
}
