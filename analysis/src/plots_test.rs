use crate::{
    metrics::calc_red2band_metrics,
    metrics_test::record,
    plots::{gen_plots_weak, gen_red2band_plots_weak, weak_rt_approx, PlotOptions},
};
use miniscale_ingest::{Record, ResultTable};
use std::fs;
use tempfile::TempDir;

fn with_block(mut record: Record, block: u64) -> Record {
    record.block_rows = block;
    record.block_cols = block;
    record
}

fn red2band_table() -> ResultTable {
    let mut records = Vec::new();
    for block in [256, 512] {
        records.push(with_block(record("red2band", 1, 10240, 0, 2.0, Some(90.0)), block));
        records.push(with_block(record("red2band", 1, 10240, 1, 2.2, Some(85.0)), block));
        records.push(with_block(record("red2band", 2, 14336, 0, 2.9, Some(170.0)), block));
        records.push(with_block(record("red2band", 4, 20480, 0, 4.1, Some(330.0)), block));
    }

    ResultTable::new(records)
}

fn names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
pub fn base_size_is_recovered_from_the_scaled_size() {
    assert_eq!(weak_rt_approx(10240, 1, 1024), 10240);
    assert_eq!(weak_rt_approx(14336, 2, 1024), 10240);
    assert_eq!(weak_rt_approx(20480, 4, 1024), 10240);
    assert_eq!(weak_rt_approx(40960, 16, 1024), 10240);
    assert_eq!(weak_rt_approx(512, 16, 1024), 1024);
}

#[test]
pub fn one_figure_per_block_size() {
    let dir = TempDir::new().unwrap();
    let options = PlotOptions {
        logx: true,
        combine_mb: false,
        prefix: String::from("daint_"),
        out_dir: dir.path().join("plots"),
    };

    let written =
        gen_red2band_plots_weak(&calc_red2band_metrics(&red2band_table()), 1024, &options).unwrap();

    assert_eq!(
        names(&written),
        vec![
            "daint_red2band_10240_b128_mb256_time.svg",
            "daint_red2band_10240_b128_mb256_perf.svg",
            "daint_red2band_10240_b128_mb512_time.svg",
            "daint_red2band_10240_b128_mb512_perf.svg",
        ]
    );
    for path in written {
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("<svg"));
    }
}

#[test]
pub fn combined_block_sizes_share_a_figure() {
    let dir = TempDir::new().unwrap();
    let options = PlotOptions {
        logx: false,
        combine_mb: true,
        out_dir: dir.path().to_path_buf(),
        ..PlotOptions::default()
    };

    let written =
        gen_red2band_plots_weak(&calc_red2band_metrics(&red2band_table()), 1024, &options).unwrap();

    assert_eq!(
        names(&written),
        vec!["red2band_10240_b128_time.svg", "red2band_10240_b128_perf.svg"]
    );

    let content = fs::read_to_string(&written[0]).unwrap();
    assert!(content.contains("dlaf mb=256"));
    assert!(content.contains("dlaf mb=512"));
}

#[test]
pub fn perf_plot_needs_perf_data() {
    let dir = TempDir::new().unwrap();
    let table = ResultTable::new(vec![
        record("trsm", 1, 10240, 0, 1.0, None),
        record("trsm", 4, 20480, 0, 1.3, None),
    ]);
    let metrics = crate::metrics::calc_metrics(&table, "trsm");
    let options = PlotOptions {
        out_dir: dir.path().to_path_buf(),
        ..PlotOptions::default()
    };

    let written = gen_plots_weak(&metrics, "trsm", 1024, &options).unwrap();

    assert_eq!(names(&written), vec!["trsm_10240_mb512_time.svg"]);
}

#[test]
pub fn nothing_to_plot() {
    let dir = TempDir::new().unwrap();
    let options = PlotOptions {
        out_dir: dir.path().to_path_buf(),
        ..PlotOptions::default()
    };

    let written =
        gen_red2band_plots_weak(&calc_red2band_metrics(&ResultTable::default()), 1024, &options)
            .unwrap();

    assert!(written.is_empty());
}
