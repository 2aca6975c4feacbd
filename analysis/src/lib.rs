pub mod metrics;
pub mod plots;
pub mod postprocess;

use miniscale_ingest::IngestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load the results")]
    Ingest(#[from] IngestError),
    #[error("Failed to draw {path}: {message}")]
    Plot { path: PathBuf, message: String },
    #[error("Failed to create {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod metrics_test;
#[cfg(test)]
mod plots_test;
#[cfg(test)]
mod postprocess_test;
