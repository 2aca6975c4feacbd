use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeSet, path::PathBuf};

/// A single miniapp run parsed from a result file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Record {
    pub bench: String,
    pub lib: String,
    pub suffix: String,
    pub nodes: u32,
    pub run_index: u32,
    // seconds
    pub time: f64,
    // GFlop/s
    pub perf: Option<f64>,
    pub element_type: Option<String>,
    pub matrix_rows: u64,
    pub matrix_cols: u64,
    pub block_rows: u64,
    pub block_cols: u64,
    pub band: Option<u64>,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub threads: u32,
    pub backend: Option<String>,
    pub source: PathBuf,
    // name of the result directory, only set when directories are distinguished
    pub dir: Option<String>,
}

impl Record {
    /// name of the series this record belongs to in tables and plots
    pub fn label(&self) -> String {
        let mut label = self.lib.clone();

        if self.suffix != "na" {
            label.push('_');
            label.push_str(&self.suffix);
        }
        if let Some(dir) = &self.dir {
            label.push('@');
            label.push_str(dir);
        }

        label
    }

    pub fn ranks(&self) -> u32 {
        self.grid_rows * self.grid_cols
    }

    fn order(&self, other: &Self) -> Ordering {
        self.bench
            .cmp(&other.bench)
            .then_with(|| self.label().cmp(&other.label()))
            .then_with(|| self.nodes.cmp(&other.nodes))
            .then_with(|| self.matrix_rows.cmp(&other.matrix_rows))
            .then_with(|| self.block_rows.cmp(&other.block_rows))
            .then_with(|| self.run_index.cmp(&other.run_index))
    }
}

/// All records parsed from a set of result directories, in a stable order
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResultTable {
    records: Vec<Record>,
}

impl ResultTable {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(Record::order);

        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// records of a single benchmark kind
    pub fn bench<'a>(&'a self, bench: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |record| record.bench == bench)
    }

    pub fn benches(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .map(|record| record.bench.as_str())
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
