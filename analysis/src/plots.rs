use crate::{
    metrics::{GroupedTable, MetricRow, Stats},
    AnalysisError,
};
use itertools::Itertools;
use plotters::{
    coord::{
        ranged1d::{AsRangedCoord, ValueFormatter},
        Shift,
    },
    prelude::*,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const FIGURE_SIZE: (u32, u32) = (1024, 768);

/// Recover the one node matrix size a weak scaling run started from
pub fn weak_rt_approx(m: u64, nodes: u32, approx: u64) -> u64 {
    let steps = (m as f64 / (nodes as f64).sqrt() / approx as f64).round() as u64;

    steps.max(1) * approx
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    // log scaled node axis
    pub logx: bool,
    // draw every block size into the same figure
    pub combine_mb: bool,
    pub prefix: String,
    pub out_dir: PathBuf,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            logx: false,
            combine_mb: false,
            prefix: String::new(),
            out_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Metric {
    Time,
    Perf,
}

impl Metric {
    fn name(self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Perf => "perf",
        }
    }

    fn axis(self) -> &'static str {
        match self {
            Metric::Time => "Time [s]",
            Metric::Perf => "GFlop/s per node",
        }
    }

    fn stats(self, row: &MetricRow) -> Option<Stats> {
        match self {
            Metric::Time => Some(row.time),
            Metric::Perf => row.perf_per_node,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct FigureKey {
    base: u64,
    band: Option<u64>,
    block: Option<u64>,
}

impl FigureKey {
    fn file_stem(&self, bench: &str, prefix: &str) -> String {
        let mut stem = format!("{prefix}{bench}_{}", self.base);
        if let Some(band) = self.band {
            stem.push_str(&format!("_b{band}"));
        }
        if let Some(block) = self.block {
            stem.push_str(&format!("_mb{block}"));
        }

        stem
    }

    fn caption(&self, bench: &str) -> String {
        let mut caption = format!("{bench} weak scaling, base size {}", self.base);
        if let Some(band) = self.band {
            caption.push_str(&format!(", band {band}"));
        }
        if let Some(block) = self.block {
            caption.push_str(&format!(", mb {block}"));
        }

        caption
    }
}

/// a line of the figure, points sorted by node count
type Series<'a> = BTreeMap<String, Vec<&'a MetricRow>>;

fn series_name(row: &MetricRow, combine_mb: bool) -> String {
    if combine_mb {
        format!("{} mb={}", row.label, row.block_rows)
    } else {
        row.label.clone()
    }
}

fn draw<X>(
    path: &Path,
    caption: &str,
    series: &Series,
    metric: Metric,
    x_range: X,
    y_max: f64,
) -> Result<(), DrawingAreaErrorKind<std::io::Error>>
where
    X: AsRangedCoord<Value = f64>,
    X::CoordDescType: ValueFormatter<f64>,
{
    let root: DrawingArea<SVGBackend, Shift> =
        SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Nodes")
        .y_desc(metric.axis())
        .draw()?;

    for (index, (name, rows)) in series.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();
        let points = rows
            .iter()
            .filter_map(|row| metric.stats(row).map(|stats| (row.nodes as f64, stats)))
            .collect::<Vec<_>>();

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|(x, stats)| (*x, stats.mean)),
                color.stroke_width(2),
            ))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart.draw_series(points.iter().map(|(x, stats)| {
            ErrorBar::new_vertical(*x, stats.min, stats.mean, stats.max, color.filled(), 8)
        }))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
}

fn render(
    path: &Path,
    caption: &str,
    series: &Series,
    metric: Metric,
    logx: bool,
) -> Result<(), AnalysisError> {
    let nodes = series
        .values()
        .flatten()
        .map(|row| row.nodes as f64)
        .collect::<Vec<_>>();
    let x_min = nodes.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = nodes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let y_max = series
        .values()
        .flatten()
        .filter_map(|row| metric.stats(row))
        .map(|stats| stats.max)
        .fold(0.0, f64::max)
        .max(f64::EPSILON)
        * 1.1;

    let result = if logx {
        draw(
            path,
            caption,
            series,
            metric,
            (x_min / 1.5..x_max * 1.5).log_scale(),
            y_max,
        )
    } else {
        draw(path, caption, series, metric, x_min - 0.5..x_max + 0.5, y_max)
    };

    result.map_err(|e| AnalysisError::Plot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Draw weak scaling plots of `bench`, one figure per base size, band and block size.
///
/// `weak_rt_approx` is the granularity the base sizes were rounded to when the jobs were
/// generated. With `combine_mb` the block sizes share a figure and are told apart in the legend.
/// Returns the paths of the written files.
pub fn gen_plots_weak(
    metrics: &GroupedTable,
    bench: &str,
    weak_rt_approx: u64,
    options: &PlotOptions,
) -> Result<Vec<PathBuf>, AnalysisError> {
    fs::create_dir_all(&options.out_dir).map_err(|source| AnalysisError::Io {
        path: options.out_dir.clone(),
        source,
    })?;

    let figures = metrics
        .iter()
        .filter(|row| row.bench == bench)
        .into_group_map_by(|row| FigureKey {
            base: self::weak_rt_approx(row.matrix_rows, row.nodes, weak_rt_approx),
            band: row.band,
            block: (!options.combine_mb).then_some(row.block_rows),
        });

    let mut written = Vec::new();
    for (key, rows) in figures.into_iter().sorted_by(|(a, _), (b, _)| a.cmp(b)) {
        let mut series = Series::new();
        for row in rows.into_iter().sorted_by_key(|row| row.nodes) {
            series
                .entry(series_name(row, options.combine_mb))
                .or_default()
                .push(row);
        }

        let stem = key.file_stem(bench, &options.prefix);
        let caption = key.caption(bench);

        for metric in [Metric::Time, Metric::Perf] {
            if metric == Metric::Perf
                && !series.values().flatten().any(|row| row.perf_per_node.is_some())
            {
                debug!(figure = %stem, "No performance data, skipping perf plot");
                continue;
            }

            let path = options
                .out_dir
                .join(format!("{stem}_{}.svg", metric.name()));
            render(&path, &caption, &series, metric, options.logx)?;

            info!(path = ?path, "Wrote plot");
            written.push(path);
        }
    }

    Ok(written)
}

pub fn gen_red2band_plots_weak(
    metrics: &GroupedTable,
    weak_rt_approx: u64,
    options: &PlotOptions,
) -> Result<Vec<PathBuf>, AnalysisError> {
    gen_plots_weak(metrics, "red2band", weak_rt_approx, options)
}
