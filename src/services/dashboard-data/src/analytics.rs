//! Summary statistics and chart projections for the data explorer series

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::types::{SeriesColumn, SeriesPoint};

/// Bin count of histogram charts
pub const HISTOGRAM_BINS: usize = 20;

/// Points shown by bar charts
pub const BAR_CHART_POINTS: usize = 30;

/// Descriptive statistics of one column
///
/// Every statistic except `count` is `None` for an empty column. `std` is the
/// sample standard deviation and is also `None` for a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: SeriesColumn,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// Describe one signal column
pub fn describe(points: &[SeriesPoint], column: SeriesColumn) -> ColumnSummary {
    let mut values: Vec<f64> = points.iter().map(|p| p.get(column)).collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std = match (mean, count) {
        (Some(m), n) if n > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };

    ColumnSummary {
        column,
        count,
        mean,
        std,
        min: values.first().copied(),
        p25: quantile(&values, 0.25),
        p50: quantile(&values, 0.50),
        p75: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

/// Linear interpolation between closest ranks of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// One histogram bin; `upper` is exclusive except for the last bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: SeriesColumn,
    pub bins: Vec<Bin>,
}

/// Equal-width histogram over `[min, max]` of a column
///
/// A constant column is binned over `[v - 0.5, v + 0.5]`. An empty column
/// yields an empty bin list.
pub fn histogram(points: &[SeriesPoint], column: SeriesColumn, bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(DashboardError::invalid_parameter(
            "bins",
            "must be greater than zero",
        ));
    }
    if points.is_empty() {
        return Ok(Histogram {
            column,
            bins: Vec::new(),
        });
    }

    let values: Vec<f64> = points.iter().map(|p| p.get(column)).collect();
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count,
        })
        .collect();

    Ok(Histogram { column, bins })
}

/// Chart kinds offered by the data explorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Scatter,
    Histogram,
}

impl std::str::FromStr for ChartKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "scatter" => Ok(Self::Scatter),
            "histogram" => Ok(Self::Histogram),
            other => Err(DashboardError::invalid_parameter(
                "chart",
                format!("unknown chart kind '{}'", other),
            )),
        }
    }
}

/// Data behind one rendered chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartProjection {
    /// `x` plus one value list per selected column
    Points {
        kind: ChartKind,
        x: Vec<f64>,
        series: Vec<(SeriesColumn, Vec<f64>)>,
    },
    Histograms { histograms: Vec<Histogram> },
}

/// Project the selected columns for a chart kind
pub fn project(
    points: &[SeriesPoint],
    kind: ChartKind,
    columns: &[SeriesColumn],
) -> Result<ChartProjection> {
    match kind {
        ChartKind::Histogram => {
            let histograms = columns
                .iter()
                .map(|&c| histogram(points, c, HISTOGRAM_BINS))
                .collect::<Result<Vec<_>>>()?;
            Ok(ChartProjection::Histograms { histograms })
        }
        ChartKind::Line | ChartKind::Scatter | ChartKind::Bar => {
            let shown = if kind == ChartKind::Bar {
                &points[..points.len().min(BAR_CHART_POINTS)]
            } else {
                points
            };
            Ok(ChartProjection::Points {
                kind,
                x: shown.iter().map(|p| p.x).collect(),
                series: columns
                    .iter()
                    .map(|&c| (c, shown.iter().map(|p| p.get(c)).collect()))
                    .collect(),
            })
        }
    }
}
