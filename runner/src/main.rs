use clap::Parser;
use miniscale_runner::{cli, executors::SlurmExecutor};
use std::{process::exit, time::Duration};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let mut executor = SlurmExecutor::new("sbatch", Duration::from_secs(args.sbatch_timeout));

    if let Err(e) = cli::run(&args, &mut executor) {
        error!("{e}");

        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            error!("caused by: {cause}");
            source = cause.source();
        }

        exit(1)
    }
}
