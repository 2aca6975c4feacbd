use crate::{collector::ResultFile, record::Record, IngestError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use tracing::{trace, warn};

// [run] time s [perf GFlop/s] [type] (m, n) (mb, nb) [band] (grid rows, grid cols) threads [backend]
static RESULT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\[(?P<run>\d+)\]\s+(?P<time>[0-9.eE+-]+)s",
        r"(?:\s+(?P<perf>[0-9.eE+-]+)GFlop/s)?",
        r"(?:\s+(?P<type>[A-Za-z]+))?",
        r"\s+\((?P<m>\d+),\s*(?P<n>\d+)\)",
        r"\s+\((?P<mb>\d+),\s*(?P<nb>\d+)\)",
        r"(?:\s+(?P<band>\d+))?",
        r"\s+\((?P<gr>\d+),\s*(?P<gc>\d+)\)",
        r"\s+(?P<threads>\d+)",
        r"(?:\s+(?P<backend>\w+))?",
        r"\s*$",
    ))
    .expect("result line regex is valid")
});

/// Values of a single result line
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub run_index: u32,
    pub time: f64,
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
}

fn number<T: std::str::FromStr>(captures: &Captures, name: &str) -> Option<T> {
    captures.name(name).and_then(|value| value.as_str().parse().ok())
}

fn text(captures: &Captures, name: &str) -> Option<String> {
    captures.name(name).map(|value| value.as_str().to_string())
}

/// parse a result line, None for everything else the job printed
pub fn parse_line(line: &str) -> Option<Measurement> {
    let captures = RESULT_LINE.captures(line.trim())?;

    Some(Measurement {
        run_index: number(&captures, "run")?,
        time: number(&captures, "time")?,
        perf: number(&captures, "perf"),
        element_type: text(&captures, "type"),
        matrix_rows: number(&captures, "m")?,
        matrix_cols: number(&captures, "n")?,
        block_rows: number(&captures, "mb")?,
        block_cols: number(&captures, "nb")?,
        band: number(&captures, "band"),
        grid_rows: number(&captures, "gr")?,
        grid_cols: number(&captures, "gc")?,
        threads: number(&captures, "threads")?,
        backend: text(&captures, "backend"),
    })
}

/// Parse every result line of a result file
pub fn parse_file(file: &ResultFile) -> Result<Vec<Record>, IngestError> {
    let content = fs::read_to_string(&file.path).map_err(|source| IngestError::Io {
        path: file.path.clone(),
        source,
    })?;

    let records: Vec<Record> = content
        .lines()
        .filter_map(|line| match parse_line(line) {
            Some(measurement) => Some(file.record(measurement)),
            None => {
                trace!(path = ?file.path, line = line, "Skipped line");
                None
            }
        })
        .collect();

    if records.is_empty() {
        warn!(path = ?file.path, "No results found, the job might have failed");
    }

    Ok(records)
}
