use crate::{parse::Measurement, record::Record, IngestError};
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// glob of the files miniapp runs append their output to
pub const RESULT_GLOB: &str = "*.out";

/// libraries the job generator writes results for
pub const KNOWN_LIBS: [&str; 3] = ["dlaf", "slate", "dplasma"];

/// A miniapp output file found in a result directory, `<nodes>/<bench>_<lib>_<suffix>.out`
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFile {
    pub path: PathBuf,
    pub nodes: u32,
    pub bench: String,
    pub lib: String,
    pub suffix: String,
    pub dir: Option<String>,
}

impl ResultFile {
    /// derive the run description from the location of an output file
    pub fn from_path(path: &Path, dir: Option<String>) -> Option<Self> {
        let nodes = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse().ok())
            .filter(|nodes| *nodes > 0)?;

        let stem = path.file_stem()?.to_str()?;
        let mut parts = stem.rsplitn(3, '_');
        let suffix = parts.next()?;
        let lib = parts.next()?;
        let bench = parts.next()?;

        if bench.is_empty() || suffix.is_empty() || !KNOWN_LIBS.contains(&lib) {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            nodes,
            bench: bench.to_string(),
            lib: lib.to_string(),
            suffix: suffix.to_string(),
            dir,
        })
    }

    pub fn record(&self, measurement: Measurement) -> Record {
        Record {
            bench: self.bench.clone(),
            lib: self.lib.clone(),
            suffix: self.suffix.clone(),
            nodes: self.nodes,
            run_index: measurement.run_index,
            time: measurement.time,
            perf: measurement.perf,
            element_type: measurement.element_type,
            matrix_rows: measurement.matrix_rows,
            matrix_cols: measurement.matrix_cols,
            block_rows: measurement.block_rows,
            block_cols: measurement.block_cols,
            band: measurement.band,
            grid_rows: measurement.grid_rows,
            grid_cols: measurement.grid_cols,
            threads: measurement.threads,
            backend: measurement.backend,
            source: self.path.clone(),
            dir: self.dir.clone(),
        }
    }
}

fn result_matcher() -> Result<GlobMatcher, IngestError> {
    Ok(GlobBuilder::new(RESULT_GLOB)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// name used to tell result directories apart
fn dir_label(root: &Path) -> Result<String, IngestError> {
    let root = root.canonicalize().map_err(|source| IngestError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned()))
}

/// Find all result files below the given result directories
pub fn collect(paths: &[PathBuf], distinguish_dir: bool) -> Result<Vec<ResultFile>, IngestError> {
    let matcher = result_matcher()?;
    let mut files = Vec::new();

    for root in paths {
        if !root.is_dir() {
            return Err(IngestError::MissingPath(root.clone()));
        }

        let dir = if distinguish_dir {
            Some(dir_label(root)?)
        } else {
            None
        };

        debug!("Searching {root:?} for results with glob: {RESULT_GLOB}");

        // result directories are often ignored by the repository they live in
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().map_or(false, |kind| kind.is_file()) {
                continue;
            }

            let path = entry.path();
            if !path.file_name().map_or(false, |name| matcher.is_match(name)) {
                continue;
            }

            match ResultFile::from_path(path, dir.clone()) {
                Some(file) => files.push(file),
                None => debug!(path = ?path, "Skipped, not in a <nodes>/<bench>_<lib>_<suffix>.out layout"),
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layout_describes_the_run() {
        let file =
            ResultFile::from_path(Path::new("/runs/weak/16/bt_red2band_dlaf_na.out"), None).unwrap();

        assert_eq!(file.nodes, 16);
        assert_eq!(file.bench, "bt_red2band");
        assert_eq!(file.lib, "dlaf");
        assert_eq!(file.suffix, "na");
    }

    #[test]
    fn unexpected_layouts_are_skipped() {
        assert_eq!(ResultFile::from_path(Path::new("/runs/weak/chol_dlaf_na.out"), None), None);
        assert_eq!(ResultFile::from_path(Path::new("/runs/0/chol_dlaf_na.out"), None), None);
        assert_eq!(ResultFile::from_path(Path::new("/runs/4/chol_na.out"), None), None);
        assert_eq!(ResultFile::from_path(Path::new("/runs/4/_dlaf_na.out"), None), None);
        assert_eq!(ResultFile::from_path(Path::new("/runs/4/chol_scalapack_na.out"), None), None);
    }
}
