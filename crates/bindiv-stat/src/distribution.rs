use serde::{Deserialize, Serialize};

use crate::aggregate::CellSummary;

/// Number of bins used for similarity histograms over `[0, 1]`.
pub const SIMILARITY_BINS: usize = 10;

/// Fixed-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges (inclusive of the left edge, exclusive of the right edge except the last bin).
    pub edges: Vec<f64>,
    /// Counts recorded per bin.
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bins `values` into `bins` equal-width buckets spanning `[start, end]`.
    ///
    /// Values outside the range are counted in the first or last bin.
    pub fn build(values: &[f64], start: f64, end: f64, bins: usize) -> Self {
        if bins == 0 {
            return Self {
                edges: vec![start],
                counts: Vec::new(),
            };
        }
        let step = (end - start) / bins as f64;
        let edges = (0..=bins).map(|idx| start + idx as f64 * step).collect();
        let mut counts = vec![0u64; bins];
        for value in values {
            let bin = ((value - start) / step).floor();
            let bin = if bin < 0.0 {
                0
            } else {
                (bin as usize).min(bins - 1)
            };
            counts[bin] += 1;
        }
        Self { edges, counts }
    }

    /// Total number of binned values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Quantile summary of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    /// 5th percentile estimate.
    pub q05: f64,
    /// Median (50th percentile) estimate.
    pub q50: f64,
    /// 95th percentile estimate.
    pub q95: f64,
}

impl Quantiles {
    /// Linear-interpolation quantiles; `None` for an empty sample.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            q05: percentile(&sorted, 0.05),
            q50: percentile(&sorted, 0.5),
            q95: percentile(&sorted, 0.95),
        })
    }
}

fn percentile(sorted: &[f64], quantile: f64) -> f64 {
    let position = quantile * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = position - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Distribution of similarity observations on the canonical `[0, 1]` scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// Histogram over `[0, 1]` with [`SIMILARITY_BINS`] bins.
    pub histogram: Histogram,
    /// Quantiles, absent when nothing was observed.
    pub quantiles: Option<Quantiles>,
    /// Count, mean and spread of the observations.
    pub summary: CellSummary,
}

impl ScoreDistribution {
    /// Summarises a sample of similarities.
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            histogram: Histogram::build(values, 0.0, 1.0, SIMILARITY_BINS),
            quantiles: Quantiles::from_values(values),
            summary: CellSummary::from_values(values),
        }
    }
}
