use crate::{
    metrics::GroupedTable,
    plots::PlotOptions,
    postprocess::{
        plot_red2band_weak, Postprocess, Postprocessor, RED2BAND_WEAK_DESCRIPTION,
        RED2BAND_WEAK_RT_APPROX,
    },
    AnalysisError,
};
use miniscale_ingest::{IngestError, JobsArgs, ResultTable};
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Postprocess steps recording how they were called
#[derive(Debug, Default)]
pub struct RecordingPostprocess {
    pub descriptions: Vec<String>,
    pub metrics: usize,
    pub plots: Vec<(u64, PlotOptions)>,
}

impl Postprocess for RecordingPostprocess {
    fn parse_jobs_cmdargs(
        &mut self,
        description: &str,
    ) -> Result<(JobsArgs, ResultTable), AnalysisError> {
        self.descriptions.push(description.to_string());

        Ok((
            JobsArgs {
                paths: vec![PathBuf::from(".")],
                distinguish_dir: false,
                prefix: String::from("eiger_"),
                out_dir: PathBuf::from("/tmp/plots"),
            },
            ResultTable::default(),
        ))
    }

    fn calc_red2band_metrics(&mut self, _table: &ResultTable) -> GroupedTable {
        self.metrics += 1;

        GroupedTable::default()
    }

    fn gen_red2band_plots_weak(
        &mut self,
        _metrics: &GroupedTable,
        weak_rt_approx: u64,
        options: &PlotOptions,
    ) -> Result<Vec<PathBuf>, AnalysisError> {
        self.plots.push((weak_rt_approx, options.clone()));

        Ok(vec![options.out_dir.join(format!("{}.svg", self.plots.len()))])
    }
}

fn write_results(root: &std::path::Path) {
    for (nodes, m) in [(1, 10240), (4, 20480)] {
        let dir = root.join(nodes.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("red2band_dlaf_na.out"),
            format!("[0] 1.5s 120.0GFlop/s d ({m}, {m}) (512, 512) 128 (1, {}) 18 mc\n", 2 * nodes),
        )
        .unwrap();
    }
}

#[test]
pub fn plots_with_and_without_combined_block_sizes() {
    let mut pp = RecordingPostprocess::default();

    let written = plot_red2band_weak(&mut pp).unwrap();

    assert_eq!(pp.descriptions, vec![RED2BAND_WEAK_DESCRIPTION]);
    assert_eq!(pp.metrics, 1);
    assert_eq!(RED2BAND_WEAK_RT_APPROX, 1024);
    assert_eq!(
        pp.plots,
        vec![
            (
                1024,
                PlotOptions {
                    logx: true,
                    combine_mb: false,
                    prefix: String::from("eiger_"),
                    out_dir: PathBuf::from("/tmp/plots"),
                }
            ),
            (
                1024,
                PlotOptions {
                    logx: true,
                    combine_mb: true,
                    prefix: String::from("eiger_"),
                    out_dir: PathBuf::from("/tmp/plots"),
                }
            ),
        ]
    );
    assert_eq!(
        written,
        vec![PathBuf::from("/tmp/plots/1.svg"), PathBuf::from("/tmp/plots/2.svg")]
    );
}

#[test]
pub fn command_line_plots_result_directory() {
    let results = TempDir::new().unwrap();
    let plots = TempDir::new().unwrap();
    write_results(results.path());

    let mut pp = Postprocessor::with_args([
        "plot-red2band-weak".into(),
        "--path".into(),
        results.path().as_os_str().to_os_string(),
        "--out-dir".into(),
        plots.path().as_os_str().to_os_string(),
        "--prefix".into(),
        "daint_".into(),
    ]);
    let written = plot_red2band_weak(&mut pp).unwrap();

    assert_eq!(written.len(), 4);
    assert!(plots
        .path()
        .join("daint_red2band_10240_b128_mb512_time.svg")
        .is_file());
    assert!(plots.path().join("daint_red2band_10240_b128_perf.svg").is_file());
}

#[test]
pub fn missing_result_directory_fails() {
    let plots = TempDir::new().unwrap();
    let mut pp = Postprocessor::with_args([
        "plot-red2band-weak".into(),
        "--path".into(),
        "/nonexistent/results".into(),
        "--out-dir".into(),
        plots.path().as_os_str().to_os_string(),
    ]);

    assert!(matches!(
        plot_red2band_weak(&mut pp),
        Err(AnalysisError::Ingest(IngestError::MissingPath(_)))
    ));
}

#[test]
pub fn help_is_reported_as_an_argument_error() {
    let mut pp = Postprocessor::with_args(["plot-red2band-weak", "--help"]);

    match plot_red2band_weak(&mut pp) {
        Err(AnalysisError::Ingest(IngestError::Arguments(e))) => {
            assert!(e.to_string().contains(RED2BAND_WEAK_DESCRIPTION));
        }
        other => panic!("unexpected result {other:?}"),
    }
}
