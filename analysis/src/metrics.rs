use itertools::Itertools;
use miniscale_ingest::{Record, ResultTable};
use serde::Serialize;

/// Summary of a set of samples
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    // sample standard deviation, 0 for a single sample
    pub std: f64,
    pub count: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std = if count > 1 {
            let squares = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            mean,
            min,
            max,
            std,
            count,
        })
    }

    /// the same statistics with every sample divided by `divisor`
    pub fn scaled(&self, divisor: f64) -> Self {
        Self {
            mean: self.mean / divisor,
            min: self.min / divisor,
            max: self.max / divisor,
            std: self.std / divisor,
            count: self.count,
        }
    }
}

/// Statistics of all runs sharing a configuration
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MetricRow {
    pub bench: String,
    pub label: String,
    pub lib: String,
    pub nodes: u32,
    pub matrix_rows: u64,
    pub block_rows: u64,
    pub band: Option<u64>,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub time: Stats,
    pub perf: Option<Stats>,
    pub perf_per_node: Option<Stats>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct GroupedTable {
    rows: Vec<MetricRow>,
}

impl GroupedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricRow> {
        self.rows.iter()
    }
}

type GroupKey = (String, u32, u64, u64, Option<u64>);

fn group_key(record: &Record) -> GroupKey {
    (
        record.label(),
        record.nodes,
        record.matrix_rows,
        record.block_rows,
        record.band,
    )
}

fn metric_row(bench: &str, records: &[&Record]) -> Option<MetricRow> {
    let first = records.first()?;
    let times = records.iter().map(|record| record.time).collect::<Vec<_>>();
    let perfs = records
        .iter()
        .filter_map(|record| record.perf)
        .collect::<Vec<_>>();
    let perf = Stats::from_samples(&perfs);

    Some(MetricRow {
        bench: bench.to_string(),
        label: first.label(),
        lib: first.lib.clone(),
        nodes: first.nodes,
        matrix_rows: first.matrix_rows,
        block_rows: first.block_rows,
        band: first.band,
        grid_rows: first.grid_rows,
        grid_cols: first.grid_cols,
        time: Stats::from_samples(&times)?,
        perf,
        perf_per_node: perf.map(|perf| perf.scaled(first.nodes as f64)),
    })
}

/// Group the records of `bench` by configuration and compute their statistics
pub fn calc_metrics(table: &ResultTable, bench: &str) -> GroupedTable {
    let mut records = table.bench(bench).collect::<Vec<_>>();
    records.sort_by_key(|record| group_key(record));

    let groups = records.into_iter().group_by(|record| group_key(record));
    let rows = groups
        .into_iter()
        .filter_map(|(_, group)| metric_row(bench, &group.collect::<Vec<_>>()))
        .collect();

    GroupedTable { rows }
}

pub fn calc_red2band_metrics(table: &ResultTable) -> GroupedTable {
    calc_metrics(table, "red2band")
}
