use crate::{
    metrics::{self, GroupedTable},
    plots::{self, PlotOptions},
    AnalysisError,
};
use miniscale_ingest::{parse_jobs_cmdargs, parse_jobs_cmdargs_from, JobsArgs, ResultTable};
use std::{ffi::OsString, path::PathBuf};
use tracing::info;

pub const RED2BAND_WEAK_DESCRIPTION: &str = "Plot red2band weak scaling benchmarks.";

/// granularity the base sizes of the red2band weak scaling jobs were rounded to
pub const RED2BAND_WEAK_RT_APPROX: u64 = 1024;

/// Loading, reduction and plotting steps the plotters are built from
pub trait Postprocess {
    /// parse the command line, described by `description`, and the result directories it selects
    fn parse_jobs_cmdargs(
        &mut self,
        description: &str,
    ) -> Result<(JobsArgs, ResultTable), AnalysisError>;

    fn calc_red2band_metrics(&mut self, table: &ResultTable) -> GroupedTable;

    fn gen_red2band_plots_weak(
        &mut self,
        metrics: &GroupedTable,
        weak_rt_approx: u64,
        options: &PlotOptions,
    ) -> Result<Vec<PathBuf>, AnalysisError>;
}

/// Postprocessing driven by the process arguments, or by a given command line
#[derive(Debug, Clone, Default)]
pub struct Postprocessor {
    args: Option<Vec<OsString>>,
}

impl Postprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// parse `args` instead of the process arguments, the first one is the program name
    pub fn with_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
        }
    }
}

impl Postprocess for Postprocessor {
    fn parse_jobs_cmdargs(
        &mut self,
        description: &str,
    ) -> Result<(JobsArgs, ResultTable), AnalysisError> {
        let parsed = match &self.args {
            Some(args) => parse_jobs_cmdargs_from(description, args.clone())?,
            None => parse_jobs_cmdargs(description)?,
        };

        Ok(parsed)
    }

    fn calc_red2band_metrics(&mut self, table: &ResultTable) -> GroupedTable {
        metrics::calc_red2band_metrics(table)
    }

    fn gen_red2band_plots_weak(
        &mut self,
        metrics: &GroupedTable,
        weak_rt_approx: u64,
        options: &PlotOptions,
    ) -> Result<Vec<PathBuf>, AnalysisError> {
        plots::gen_red2band_plots_weak(metrics, weak_rt_approx, options)
    }
}

/// Plot the red2band weak scaling results, once per block size and once with all block sizes combined
pub fn plot_red2band_weak(pp: &mut dyn Postprocess) -> Result<Vec<PathBuf>, AnalysisError> {
    let (jobs, table) = pp.parse_jobs_cmdargs(RED2BAND_WEAK_DESCRIPTION)?;
    let metrics = pp.calc_red2band_metrics(&table);

    info!(
        records = table.len(),
        configurations = metrics.len(),
        "Computed red2band metrics"
    );

    let mut written = Vec::new();
    for combine_mb in [false, true] {
        let options = PlotOptions {
            logx: true,
            combine_mb,
            prefix: jobs.prefix.clone(),
            out_dir: jobs.out_dir.clone(),
        };

        written.extend(pp.gen_red2band_plots_weak(&metrics, RED2BAND_WEAK_RT_APPROX, &options)?);
    }

    Ok(written)
}
