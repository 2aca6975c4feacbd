pub mod collector;
pub mod parse;
pub mod record;

pub use record::{Record, ResultTable};

use clap::{Args, Command, FromArgMatches};
use rayon::prelude::*;
use std::{ffi::OsString, path::PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Result directory {0} does not exist")]
    MissingPath(PathBuf),
    #[error("Failed to search for results")]
    Walk(#[from] ignore::Error),
    #[error("Globs were invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error(transparent)]
    Arguments(#[from] clap::Error),
}

/// Command line arguments selecting the result directories to parse
#[derive(Args, Debug, Clone, PartialEq)]
pub struct JobsArgs {
    /// Plot results from this directory, can be given multiple times
    #[arg(long = "path", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Add the result directory to the benchmark name. Useful when comparing different runs.
    #[arg(long)]
    pub distinguish_dir: bool,

    /// Add a prefix to the filename of the plots
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Directory the plots are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Parse all result files found below `paths`
pub fn parse_jobs(paths: &[PathBuf], distinguish_dir: bool) -> Result<ResultTable, IngestError> {
    let files = collector::collect(paths, distinguish_dir)?;

    let records = files
        .par_iter()
        .map(parse::parse_file)
        .collect::<Result<Vec<_>, IngestError>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    info!(
        files = files.len(),
        records = records.len(),
        "Parsed result files"
    );

    Ok(ResultTable::new(records))
}

/// Parse `args` with a parser described by `description`, then parse the selected results
pub fn parse_jobs_cmdargs_from<I, T>(
    description: &str,
    args: I,
) -> Result<(JobsArgs, ResultTable), IngestError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let command = JobsArgs::augment_args(
        Command::new(clap::crate_name!()).about(description.to_string()),
    );
    let matches = command.try_get_matches_from(args)?;
    let jobs = JobsArgs::from_arg_matches(&matches)?;
    let table = parse_jobs(&jobs.paths, jobs.distinguish_dir)?;

    Ok((jobs, table))
}

/// Same as `parse_jobs_cmdargs_from` with the arguments of the process
pub fn parse_jobs_cmdargs(description: &str) -> Result<(JobsArgs, ResultTable), IngestError> {
    parse_jobs_cmdargs_from(description, std::env::args_os())
}

#[cfg(test)]
mod lib_test;
