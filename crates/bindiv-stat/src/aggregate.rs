use std::collections::BTreeMap;
use std::marker::PhantomData;

use bindiv_core::errors::{BindivError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Backing storage for aggregator samples.
///
/// Stores only hold raw observations; all statistics are derived at
/// finalisation so accumulation order never matters.
pub trait SampleStore<K> {
    /// Ensures `key` exists even if it never receives an observation.
    fn register(&mut self, key: K);
    /// Appends one observation for `key`.
    fn push(&mut self, key: K, value: f64);
    /// Visits every key with its observations in key order.
    fn for_each_sample(&self, visit: &mut dyn FnMut(&K, &[f64]));
}

/// In-memory [`SampleStore`] ordered by key.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore<K: Ord> {
    cells: BTreeMap<K, Vec<f64>>,
}

impl<K: Ord> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }
}

impl<K: Ord> SampleStore<K> for MemoryStore<K> {
    fn register(&mut self, key: K) {
        self.cells.entry(key).or_default();
    }

    fn push(&mut self, key: K, value: f64) {
        self.cells.entry(key).or_default().push(value);
    }

    fn for_each_sample(&self, visit: &mut dyn FnMut(&K, &[f64])) {
        for (key, values) in &self.cells {
            visit(key, values);
        }
    }
}

/// Count, mean and spread of the observations recorded for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    /// Number of observations (always at least one).
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1); `None` for a single observation.
    pub std_dev: Option<f64>,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
}

/// Finalised state of one aggregate cell.
///
/// `NoData` is deliberately distinct from an observed mean of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum CellSummary {
    /// The key was registered but never observed.
    NoData,
    /// At least one observation was recorded.
    Observed(CellStats),
}

impl CellSummary {
    /// Computes the summary of a sample independently of its order.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return CellSummary::NoData;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std_dev = (count > 1).then(|| {
            let squares: f64 = sorted.iter().map(|value| (value - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        });
        CellSummary::Observed(CellStats {
            count,
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }

    /// Observed statistics, if any.
    pub fn stats(&self) -> Option<&CellStats> {
        match self {
            CellSummary::NoData => None,
            CellSummary::Observed(stats) => Some(stats),
        }
    }

    /// Mean of the observations, `None` when the cell has no data.
    pub fn mean(&self) -> Option<f64> {
        self.stats().map(|stats| stats.mean)
    }

    /// Number of observations (zero for `NoData`).
    pub fn count(&self) -> usize {
        self.stats().map_or(0, |stats| stats.count)
    }
}

/// Accumulates similarity observations keyed by group pair or function name.
#[derive(Debug, Clone)]
pub struct Aggregator<K: Ord, S = MemoryStore<K>> {
    store: S,
    observations: usize,
    _key: PhantomData<K>,
}

impl<K: Ord + Clone> Aggregator<K, MemoryStore<K>> {
    /// Creates an aggregator backed by an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::default())
    }
}

impl<K: Ord + Clone> Default for Aggregator<K, MemoryStore<K>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, S: SampleStore<K>> Aggregator<K, S> {
    /// Creates an aggregator on top of the provided store.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            observations: 0,
            _key: PhantomData,
        }
    }

    /// Declares a key that must appear in the finalised output.
    pub fn register(&mut self, key: K) {
        self.store.register(key);
    }

    /// Appends an observation; non-finite values are rejected, never stored.
    pub fn accumulate(&mut self, key: K, value: f64) -> Result<(), BindivError> {
        if !value.is_finite() {
            return Err(BindivError::Aggregation(
                ErrorInfo::new("bindiv_stat.non_finite", "refusing non-finite observation")
                    .with_context("value", value.to_string()),
            ));
        }
        self.store.push(key, value);
        self.observations += 1;
        Ok(())
    }

    /// Total number of observations accumulated so far.
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Per-key summaries; registered keys without observations yield `NoData`.
    pub fn finalize(&self) -> BTreeMap<K, CellSummary> {
        let mut summaries = BTreeMap::new();
        self.store.for_each_sample(&mut |key, values| {
            summaries.insert(key.clone(), CellSummary::from_values(values));
        });
        summaries
    }

    /// Consumes the aggregator and returns its store.
    pub fn into_store(self) -> S {
        self.store
    }
}
