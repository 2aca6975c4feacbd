use miniscale_analysis::{
    postprocess::{plot_red2band_weak, Postprocessor},
    AnalysisError,
};
use miniscale_ingest::IngestError;
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match plot_red2band_weak(&mut Postprocessor::new()) {
        Ok(written) => info!(plots = written.len(), "Done"),
        // --help, --version and usage errors
        Err(AnalysisError::Ingest(IngestError::Arguments(e))) => e.exit(),
        Err(e) => {
            error!("{e}");

            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("caused by: {cause}");
                source = cause.source();
            }

            exit(1)
        }
    }
}
