use crate::metrics::{calc_metrics, calc_red2band_metrics, Stats};
use miniscale_ingest::{Record, ResultTable};
use std::path::PathBuf;

pub fn record(bench: &str, nodes: u32, m: u64, run_index: u32, time: f64, perf: Option<f64>) -> Record {
    Record {
        bench: bench.to_string(),
        lib: String::from("dlaf"),
        suffix: String::from("na"),
        nodes,
        run_index,
        time,
        perf,
        element_type: Some(String::from("d")),
        matrix_rows: m,
        matrix_cols: m,
        block_rows: 512,
        block_cols: 512,
        band: (bench == "red2band").then_some(128),
        grid_rows: 1,
        grid_cols: 2 * nodes,
        threads: 18,
        backend: Some(String::from("mc")),
        source: PathBuf::from(format!("/runs/{nodes}/{bench}_dlaf_na.out")),
        dir: None,
    }
}

#[test]
pub fn stats_of_samples() {
    let stats = Stats::from_samples(&[1.0, 2.0, 3.0]).unwrap();

    assert_eq!(stats.mean, 2.0);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 3.0);
    assert_eq!(stats.std, 1.0);
    assert_eq!(stats.count, 3);

    assert_eq!(Stats::from_samples(&[4.0]).unwrap().std, 0.0);
    assert_eq!(Stats::from_samples(&[]), None);
}

#[test]
pub fn runs_of_a_configuration_are_grouped() {
    let table = ResultTable::new(vec![
        record("red2band", 4, 20480, 1, 3.0, Some(300.0)),
        record("red2band", 1, 10240, 0, 1.0, Some(100.0)),
        record("red2band", 1, 10240, 1, 2.0, Some(50.0)),
        record("red2band", 4, 20480, 0, 5.0, Some(100.0)),
        record("chol", 1, 10240, 0, 0.5, Some(400.0)),
    ]);

    let metrics = calc_red2band_metrics(&table);
    let rows = metrics.iter().collect::<Vec<_>>();

    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].nodes, 1);
    assert_eq!(rows[0].band, Some(128));
    assert_eq!(rows[0].time.mean, 1.5);
    assert_eq!(rows[0].time.count, 2);

    assert_eq!(rows[1].nodes, 4);
    assert_eq!(rows[1].matrix_rows, 20480);
    assert_eq!(rows[1].time.min, 3.0);
    assert_eq!(rows[1].time.max, 5.0);
    assert_eq!(rows[1].perf.unwrap().mean, 200.0);
    assert_eq!(rows[1].perf_per_node.unwrap().mean, 50.0);
}

#[test]
pub fn missing_perf_yields_no_perf_statistics() {
    let table = ResultTable::new(vec![
        record("trsm", 2, 14336, 0, 1.0, None),
        record("trsm", 2, 14336, 1, 1.2, None),
    ]);

    let metrics = calc_metrics(&table, "trsm");
    let row = metrics.iter().next().unwrap();

    assert_eq!(row.time.count, 2);
    assert_eq!(row.perf, None);
    assert_eq!(row.perf_per_node, None);
}

#[test]
pub fn unknown_bench_is_empty() {
    let table = ResultTable::new(vec![record("chol", 1, 10240, 0, 0.5, None)]);

    assert!(calc_metrics(&table, "evp").is_empty());
}
