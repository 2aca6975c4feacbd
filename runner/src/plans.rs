use crate::{
    miniapps::{Lib, Miniapp, RunParams, SizeParams},
    scaling::{PlanError, WeakScaling},
    systems::System,
};
use std::path::Path;

pub const SYSTEM: &str = "daint-mc";
pub const DLAF_PATH: &str = "<path_to_dlaf>";
pub const RUN_DIR: &str = "~/ws/runs_w";
pub const RUN_NAME: &str = "DLAF_test_weak";
pub const JOB_NAME: &str = "job_dlaf";

// job time is time0 + sqrt(nodes) * time, in minutes
pub const TIME0: f64 = 120.0;
pub const TIME: f64 = 0.0;

// the sizes used in weak scaling are the nearest multiple of approx
pub const APPROX: u64 = 512;
pub const NRUNS: u32 = 5;
pub const NODES: [u32; 3] = [1, 2, 4];
pub const M_SZ: u64 = 10240;

const RPN: u32 = 2;
const MB_SZ: u64 = 512;
const BAND: u64 = 128;

/// Weak scaling of every DLA-Future miniapp with 2 ranks per node
pub fn dlaf_weak(system: &System, dlaf_path: &Path) -> Result<WeakScaling, PlanError> {
    let mut run = WeakScaling::new(system, RUN_NAME, JOB_NAME, &NODES, TIME0, TIME);
    let size = SizeParams { m_sz: M_SZ };
    let params = RunParams::new(RPN, MB_SZ);
    let banded = params.clone().band(BAND);

    run.add(Miniapp::Chol, Lib::Dlaf, dlaf_path, params.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::Gen2Std, Lib::Dlaf, dlaf_path, params.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::Red2Band, Lib::Dlaf, dlaf_path, banded.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::Band2Trid, Lib::Dlaf, dlaf_path, banded.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::TridEvp, Lib::Dlaf, dlaf_path, params.clone(), size, APPROX, NRUNS)?
        // n_sz left unset: the back-transformations use the matrix size
        .add(Miniapp::BtBand2Trid, Lib::Dlaf, dlaf_path, banded.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::BtRed2Band, Lib::Dlaf, dlaf_path, banded, size, APPROX, NRUNS)?
        .add(Miniapp::Trsm, Lib::Dlaf, dlaf_path, params.clone(), size, APPROX, NRUNS)?
        // min_band left unset: eigensolver default
        .add(Miniapp::Evp, Lib::Dlaf, dlaf_path, params.clone(), size, APPROX, NRUNS)?
        .add(Miniapp::Gevp, Lib::Dlaf, dlaf_path, params, size, APPROX, NRUNS)?;

    Ok(run)
}
