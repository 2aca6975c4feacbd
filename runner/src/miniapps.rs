use crate::systems::System;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, path::Path, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MiniappError {
    #[error("Unknown miniapp '{0}', expected one of: {known}", known = Miniapp::ALL.iter().map(Miniapp::name).join(", "))]
    UnknownMiniapp(String),
    #[error("Unknown library '{0}'")]
    UnknownLib(String),
    #[error("{miniapp} is not available for {lib}")]
    UnsupportedLib { miniapp: Miniapp, lib: Lib },
    #[error("{miniapp} requires the '{param}' parameter")]
    MissingParam {
        miniapp: Miniapp,
        param: &'static str,
    },
    #[error("Invalid parameters for {miniapp}: {reason}")]
    InvalidParam { miniapp: Miniapp, reason: String },
    #[error("{nodes} nodes with {rpn} ranks per node exceed the supported number of ranks")]
    TooManyRanks { nodes: u32, rpn: u32 },
    #[error("{rpn} ranks per node not allowed on {system} (allowed: {allowed:?})")]
    UnsupportedRpn {
        system: String,
        rpn: u32,
        allowed: Vec<u32>,
    },
}

/// All benchmark kinds a plan can be built from
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Miniapp {
    #[serde(rename = "chol")]
    Chol,
    #[serde(rename = "gen2std")]
    Gen2Std,
    #[serde(rename = "red2band")]
    Red2Band,
    #[serde(rename = "band2trid")]
    Band2Trid,
    #[serde(rename = "trid_evp")]
    TridEvp,
    #[serde(rename = "bt_band2trid")]
    BtBand2Trid,
    #[serde(rename = "bt_red2band")]
    BtRed2Band,
    #[serde(rename = "trsm")]
    Trsm,
    #[serde(rename = "evp")]
    Evp,
    #[serde(rename = "gevp")]
    Gevp,
}

impl Miniapp {
    pub const ALL: [Miniapp; 10] = [
        Miniapp::Chol,
        Miniapp::Gen2Std,
        Miniapp::Red2Band,
        Miniapp::Band2Trid,
        Miniapp::TridEvp,
        Miniapp::BtBand2Trid,
        Miniapp::BtRed2Band,
        Miniapp::Trsm,
        Miniapp::Evp,
        Miniapp::Gevp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chol => "chol",
            Self::Gen2Std => "gen2std",
            Self::Red2Band => "red2band",
            Self::Band2Trid => "band2trid",
            Self::TridEvp => "trid_evp",
            Self::BtBand2Trid => "bt_band2trid",
            Self::BtRed2Band => "bt_red2band",
            Self::Trsm => "trsm",
            Self::Evp => "evp",
            Self::Gevp => "gevp",
        }
    }

    /// name of the DLA-Future miniapp executable
    pub fn dlaf_binary(&self) -> &'static str {
        match self {
            Self::Chol => "miniapp_cholesky",
            Self::Gen2Std => "miniapp_gen_to_std",
            Self::Red2Band => "miniapp_reduction_to_band",
            Self::Band2Trid => "miniapp_band_to_tridiag",
            Self::TridEvp => "miniapp_tridiag_solver",
            Self::BtBand2Trid => "miniapp_bt_band_to_tridiag",
            Self::BtRed2Band => "miniapp_bt_reduction_to_band",
            Self::Trsm => "miniapp_triangular_solver",
            Self::Evp => "miniapp_eigensolver",
            Self::Gevp => "miniapp_gen_eigensolver",
        }
    }

    pub fn requires_band(&self) -> bool {
        matches!(
            self,
            Self::Red2Band | Self::Band2Trid | Self::BtBand2Trid | Self::BtRed2Band
        )
    }

    /// operations with a right hand side/ set of eigenvectors of size n
    pub fn takes_n(&self) -> bool {
        matches!(self, Self::BtBand2Trid | Self::BtRed2Band | Self::Trsm)
    }

    pub fn takes_min_band(&self) -> bool {
        matches!(self, Self::Evp | Self::Gevp)
    }

    pub fn supports(&self, lib: Lib) -> bool {
        match lib {
            Lib::Dlaf => true,
            Lib::Slate => matches!(
                self,
                Self::Chol | Self::Trsm | Self::Red2Band | Self::Evp | Self::Gevp
            ),
            Lib::Dplasma => matches!(self, Self::Chol),
        }
    }

    /// check that a run of this miniapp can be rendered with the given library and parameters
    pub fn validate(&self, lib: Lib, params: &RunParams) -> Result<(), MiniappError> {
        if !self.supports(lib) {
            return Err(MiniappError::UnsupportedLib { miniapp: *self, lib });
        }

        if params.rpn == 0 {
            return Err(MiniappError::InvalidParam {
                miniapp: *self,
                reason: String::from("rpn must be positive"),
            });
        }

        if params.mb_sz == 0 {
            return Err(MiniappError::InvalidParam {
                miniapp: *self,
                reason: String::from("mb_sz must be positive"),
            });
        }

        if self.requires_band() {
            match params.band {
                None => {
                    return Err(MiniappError::MissingParam {
                        miniapp: *self,
                        param: "band",
                    })
                }
                Some(band) if band == 0 || params.mb_sz % band != 0 => {
                    return Err(MiniappError::InvalidParam {
                        miniapp: *self,
                        reason: format!("band ({band}) must divide mb_sz ({})", params.mb_sz),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Render the launcher line running this miniapp for one job
    pub fn command(&self, ctx: &CommandContext) -> Result<String, MiniappError> {
        self.validate(ctx.lib, ctx.params)?;

        let resources = Resources::compute(ctx.system, ctx.nodes, ctx.params.rpn)?;
        let invocation = match ctx.lib {
            Lib::Dlaf => self.dlaf_args(ctx, &resources),
            Lib::Slate => self.slate_args(ctx, &resources),
            Lib::Dplasma => self.dplasma_args(ctx, &resources),
        };

        let mut line = Vec::new();
        if !ctx.env.trim().is_empty() {
            line.push(ctx.env.trim().to_string());
        }
        line.push(format!(
            "{} -n {} -c {}",
            ctx.system.launcher, resources.ranks, resources.cpus_per_rank
        ));
        if ctx.system.gpu {
            line.push(String::from("--gpus-per-task=1"));
        }
        line.push(invocation);
        if !ctx.extra_flags.trim().is_empty() {
            line.push(ctx.extra_flags.trim().to_string());
        }
        line.push(format!(
            ">> {} 2>&1",
            output_file_name(*self, ctx.lib, ctx.suffix)
        ));

        Ok(line.join(" "))
    }

    fn dlaf_args(&self, ctx: &CommandContext, resources: &Resources) -> String {
        let binary = ctx.build_dir.join("miniapp").join(self.dlaf_binary());
        let m_sz = ctx.m_sz;
        let mb_sz = ctx.params.mb_sz;
        let n_sz = ctx.params.n_sz.unwrap_or(m_sz);

        let mut args = vec![binary.to_string_lossy().into_owned()];

        match self {
            Self::BtBand2Trid | Self::BtRed2Band | Self::Trsm => {
                args.push(format!("--m {m_sz} --n {n_sz} --mb {mb_sz} --nb {mb_sz}"));
                if let Some(band) = ctx.params.band.filter(|_| self.requires_band()) {
                    args.push(format!("--b {band}"));
                }
            }
            _ => {
                args.push(format!("--matrix-size {m_sz} --block-size {mb_sz}"));
                if let Some(band) = ctx.params.band.filter(|_| self.requires_band()) {
                    args.push(format!("--band-size {band}"));
                }
            }
        }

        args.push(format!(
            "--grid-rows {} --grid-cols {}",
            resources.grid_rows, resources.grid_cols
        ));
        args.push(format!(
            "--nruns {} --nwarmups 1 --check-result none",
            ctx.nruns
        ));

        if self.takes_min_band() {
            if let Some(min_band) = ctx.params.min_band {
                args.push(format!("--dlaf:eigensolver-min-band={min_band}"));
            }
        }

        args.push(format!("--pika:threads={}", resources.threads));

        args.join(" ")
    }

    fn slate_args(&self, ctx: &CommandContext, resources: &Resources) -> String {
        let binary = ctx.build_dir.join("test").join("tester");
        let routine = match self {
            Self::Chol => "potrf",
            Self::Trsm => "trsm",
            Self::Red2Band => "he2hb",
            Self::Evp => "heev",
            _ => "hegv",
        };
        let n_sz = ctx.params.n_sz.unwrap_or(ctx.m_sz);
        let target = if ctx.system.gpu { "d" } else { "t" };

        format!(
            "{} --origin h --target {target} --type d --nb {} --dim {}x{} --p {} --q {} --repeat {} --check n --ref n {routine}",
            binary.to_string_lossy(),
            ctx.params.mb_sz,
            ctx.m_sz,
            if self.takes_n() { n_sz } else { ctx.m_sz },
            resources.grid_rows,
            resources.grid_cols,
            ctx.nruns,
        )
    }

    fn dplasma_args(&self, ctx: &CommandContext, resources: &Resources) -> String {
        let binary = ctx.build_dir.join("tests").join("testing_dpotrf");

        format!(
            "{} -N {} --MB {} --NB {} --grid-rows {} --nruns {} -c {} -v",
            binary.to_string_lossy(),
            ctx.m_sz,
            ctx.params.mb_sz,
            ctx.params.mb_sz,
            resources.grid_rows,
            ctx.nruns,
            resources.threads,
        )
    }
}

impl Display for Miniapp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Miniapp {
    type Err = MiniappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|miniapp| miniapp.name() == s)
            .ok_or_else(|| MiniappError::UnknownMiniapp(s.to_string()))
    }
}

/// Library implementing the benchmarked operation
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Lib {
    Dlaf,
    Slate,
    Dplasma,
}

impl Lib {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dlaf => "dlaf",
            Self::Slate => "slate",
            Self::Dplasma => "dplasma",
        }
    }
}

impl Display for Lib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Lib {
    type Err = MiniappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dlaf" => Ok(Self::Dlaf),
            "slate" => Ok(Self::Slate),
            "dplasma" => Ok(Self::Dplasma),
            other => Err(MiniappError::UnknownLib(other.to_string())),
        }
    }
}

/// Per run parameters, `None` selects the miniapp default
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunParams {
    pub rpn: u32,
    pub mb_sz: u64,
    #[serde(default)]
    pub band: Option<u64>,
    // defaults to the (scaled) matrix size
    #[serde(default)]
    pub n_sz: Option<u64>,
    #[serde(default)]
    pub min_band: Option<u64>,
}

impl RunParams {
    pub fn new(rpn: u32, mb_sz: u64) -> Self {
        Self {
            rpn,
            mb_sz,
            ..Default::default()
        }
    }

    pub fn band(mut self, band: u64) -> Self {
        self.band = Some(band);
        self
    }

    pub fn n_sz(mut self, n_sz: u64) -> Self {
        self.n_sz = Some(n_sz);
        self
    }

    pub fn min_band(mut self, min_band: u64) -> Self {
        self.min_band = Some(min_band);
        self
    }
}

/// Matrix sizes of a run, in weak scaling these describe the single node case
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SizeParams {
    pub m_sz: u64,
}

/// Everything needed to render a single launcher line
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub system: &'a System,
    pub lib: Lib,
    pub build_dir: &'a Path,
    pub nodes: u32,
    pub params: &'a RunParams,
    pub m_sz: u64,
    pub nruns: u32,
    pub suffix: &'a str,
    pub extra_flags: &'a str,
    pub env: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub ranks: u32,
    pub threads: u32,
    pub cpus_per_rank: u32,
    pub grid_rows: u32,
    pub grid_cols: u32,
}

impl Resources {
    pub fn compute(system: &System, nodes: u32, rpn: u32) -> Result<Self, MiniappError> {
        if !system.allows_rpn(rpn) {
            return Err(MiniappError::UnsupportedRpn {
                system: system.name.clone(),
                rpn,
                allowed: system.allowed_rpns.clone(),
            });
        }

        let ranks = nodes
            .checked_mul(rpn)
            .ok_or(MiniappError::TooManyRanks { nodes, rpn })?;
        let threads = system.cores / rpn;
        let (grid_rows, grid_cols) = grid(ranks);

        Ok(Self {
            ranks,
            threads,
            cpus_per_rank: threads * system.threads_per_core,
            grid_rows,
            grid_cols,
        })
    }
}

/// largest factor of n not above sqrt(n)
pub fn sq_factor(n: u32) -> u32 {
    (1..=n)
        .take_while(|&i| u64::from(i) * u64::from(i) <= u64::from(n))
        .filter(|i| n % i == 0)
        .last()
        .unwrap_or(1)
}

/// process grid with rows <= cols for the given number of ranks
pub fn grid(ranks: u32) -> (u32, u32) {
    let rows = sq_factor(ranks);
    (rows, ranks / rows.max(1))
}

/// file the miniapp output of a run is appended to, relative to the job directory
pub fn output_file_name(miniapp: Miniapp, lib: Lib, suffix: &str) -> String {
    format!("{miniapp}_{lib}_{suffix}.out")
}
