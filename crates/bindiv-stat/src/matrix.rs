use std::collections::{BTreeMap, BTreeSet};

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::GroupPair;
use serde::{Deserialize, Serialize};

use crate::aggregate::CellSummary;

/// Absolute tolerance used for symmetry and diagonal checks.
pub const MATRIX_TOLERANCE: f64 = 1e-9;

fn embedding_error(code: &str, message: impl Into<String>) -> BindivError {
    BindivError::Embedding(ErrorInfo::new(code, message))
}

/// Symmetric matrix of finalised group-pair similarity cells.
///
/// The diagonal is never computed; it is assumed perfect and reported as a
/// similarity of 1.0. Off-diagonal cells keep their [`CellSummary`], so a
/// pair without observations stays [`CellSummary::NoData`] all the way to the
/// distance transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    labels: Vec<String>,
    cells: Vec<CellSummary>,
}

impl SimilarityMatrix {
    /// Builds the matrix for `labels` (in plan order) from per-pair summaries.
    ///
    /// Pairs absent from `cells` are treated as `NoData`. Either orientation of
    /// a [`GroupPair`] is accepted, but not both.
    pub fn from_cells(
        labels: Vec<String>,
        cells: &BTreeMap<GroupPair, CellSummary>,
    ) -> Result<Self, BindivError> {
        if labels.len() < 2 {
            return Err(embedding_error(
                "bindiv_stat.matrix_size",
                "similarity matrix needs at least two groups",
            ));
        }
        ensure_unique(&labels)?;

        let n = labels.len();
        let mut grid: Vec<Option<CellSummary>> = vec![None; n * n];
        for (pair, summary) in cells {
            let i = position(&labels, &pair.primary)?;
            let j = position(&labels, &pair.secondary)?;
            if i == j {
                return Err(BindivError::Embedding(
                    ErrorInfo::new("bindiv_stat.self_pair", "a group cannot be paired with itself")
                        .with_context("label", pair.primary.clone()),
                ));
            }
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            if grid[lo * n + hi].is_some() {
                return Err(BindivError::Embedding(
                    ErrorInfo::new("bindiv_stat.duplicate_cell", "group pair recorded twice")
                        .with_context("pair", pair.to_string()),
                ));
            }
            grid[lo * n + hi] = Some(summary.clone());
            grid[hi * n + lo] = Some(summary.clone());
        }

        let cells = grid
            .into_iter()
            .map(|cell| cell.unwrap_or(CellSummary::NoData))
            .collect();
        Ok(Self { labels, cells })
    }

    /// Group labels in matrix order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true when the matrix has no groups.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Summary for an off-diagonal cell; `None` on the diagonal or out of range.
    pub fn cell(&self, i: usize, j: usize) -> Option<&CellSummary> {
        let n = self.len();
        if i == j || i >= n || j >= n {
            return None;
        }
        self.cells.get(i * n + j)
    }

    /// Mean similarity; 1.0 on the diagonal, `None` for missing cells.
    pub fn mean(&self, i: usize, j: usize) -> Option<f64> {
        if i == j && i < self.len() {
            return Some(1.0);
        }
        self.cell(i, j).and_then(CellSummary::mean)
    }

    /// Group pairs (lower index first) without any observation.
    pub fn missing_pairs(&self) -> Vec<GroupPair> {
        let n = self.len();
        let mut missing = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if self.mean(i, j).is_none() {
                    missing.push(GroupPair::new(&self.labels[i], &self.labels[j]));
                }
            }
        }
        missing
    }

    /// Distance transform `D = 1 - M` with an exact zero diagonal.
    pub fn to_distance(&self) -> DistanceMatrix {
        let n = self.len();
        let mut values = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let value = if i == j {
                    Some(0.0)
                } else {
                    self.mean(i, j).map(|mean| (1.0 - mean).max(0.0))
                };
                values.push(value);
            }
        }
        DistanceMatrix {
            labels: self.labels.clone(),
            values,
        }
    }

    /// Presentation table of `mean ± std` percentages.
    pub fn annotate(&self) -> AnnotatedMatrix {
        let n = self.len();
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            return "0.00 ± 0.00".to_string();
                        }
                        match self.cell(i, j).and_then(CellSummary::stats) {
                            None => "- ± -".to_string(),
                            Some(stats) => {
                                let spread = stats
                                    .std_dev
                                    .map(|std| format!("{:.2}", std * 100.0))
                                    .unwrap_or_else(|| "-".to_string());
                                format!("{:.2} ± {}", stats.mean * 100.0, spread)
                            }
                        }
                    })
                    .collect()
            })
            .collect();
        AnnotatedMatrix {
            labels: self.labels.clone(),
            rows,
        }
    }
}

fn position(labels: &[String], label: &str) -> Result<usize, BindivError> {
    labels.iter().position(|known| known == label).ok_or_else(|| {
        BindivError::Embedding(
            ErrorInfo::new("bindiv_stat.unknown_label", "group pair references an unknown label")
                .with_context("label", label.to_string()),
        )
    })
}

/// Rendered `mean ± std` table (percent, two decimals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedMatrix {
    /// Row and column labels.
    pub labels: Vec<String>,
    /// Rendered cells, row major.
    pub rows: Vec<Vec<String>>,
}

/// Square symmetric distance matrix; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistanceMatrixRepr", into = "DistanceMatrixRepr")]
pub struct DistanceMatrix {
    labels: Vec<String>,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DistanceMatrixRepr {
    labels: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl TryFrom<DistanceMatrixRepr> for DistanceMatrix {
    type Error = BindivError;

    fn try_from(repr: DistanceMatrixRepr) -> Result<Self, Self::Error> {
        DistanceMatrix::new(repr.labels, repr.rows)
    }
}

impl From<DistanceMatrix> for DistanceMatrixRepr {
    fn from(matrix: DistanceMatrix) -> Self {
        Self {
            rows: matrix.rows(),
            labels: matrix.labels,
        }
    }
}

impl DistanceMatrix {
    /// Validates and builds a matrix from explicit rows.
    ///
    /// Rows must be square, symmetric within [`MATRIX_TOLERANCE`], finite and
    /// non-negative. The diagonal must be zero (or missing) and is stored as
    /// exactly 0.
    pub fn new(labels: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Result<Self, BindivError> {
        let n = labels.len();
        if rows.len() != n || rows.iter().any(|row| row.len() != n) {
            return Err(BindivError::Embedding(
                ErrorInfo::new("bindiv_stat.matrix_shape", "distance matrix must be square")
                    .with_context("labels", n.to_string())
                    .with_context("rows", rows.len().to_string()),
            ));
        }
        ensure_unique(&labels)?;
        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                if let Some(value) = value {
                    if !value.is_finite() || *value < 0.0 {
                        return Err(cell_error(
                            "bindiv_stat.matrix_value",
                            "distances must be finite and non-negative",
                            &labels,
                            i,
                            j,
                        ));
                    }
                }
                if i == j {
                    if value.is_some_and(|value| value.abs() > MATRIX_TOLERANCE) {
                        return Err(cell_error(
                            "bindiv_stat.matrix_diagonal",
                            "distance diagonal must be zero",
                            &labels,
                            i,
                            j,
                        ));
                    }
                    values.push(Some(0.0));
                    continue;
                }
                let mirrored = rows[j][i];
                let symmetric = match (value, mirrored) {
                    (Some(a), Some(b)) => (a - b).abs() <= MATRIX_TOLERANCE,
                    (None, None) => true,
                    _ => false,
                };
                if !symmetric {
                    return Err(cell_error(
                        "bindiv_stat.matrix_symmetry",
                        "distance matrix must be symmetric",
                        &labels,
                        i,
                        j,
                    ));
                }
                values.push(*value);
            }
        }
        Ok(Self { labels, values })
    }

    /// Group labels in matrix order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true when the matrix has no groups.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distance between groups `i` and `j`; `None` when missing or out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.len();
        if i >= n || j >= n {
            return None;
        }
        self.values[i * n + j]
    }

    /// Index of `label` in matrix order.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|known| known == label)
    }

    /// Row-major copy of the cells.
    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        self.values.chunks(n).map(<[Option<f64>]>::to_vec).collect()
    }

    /// Number of unordered off-diagonal pairs without a distance.
    pub fn missing_count(&self) -> usize {
        let n = self.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.values[i * n + j].is_none())
            .count()
    }

    /// Exact symmetry check, missing cells included.
    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| (0..n).all(|j| self.values[i * n + j] == self.values[j * n + i]))
    }
}

fn cell_error(code: &str, message: &str, labels: &[String], i: usize, j: usize) -> BindivError {
    BindivError::Embedding(
        ErrorInfo::new(code, message)
            .with_context("row", labels[i].clone())
            .with_context("column", labels[j].clone()),
    )
}

fn ensure_unique(labels: &[String]) -> Result<(), BindivError> {
    let mut seen = BTreeSet::new();
    match labels.iter().find(|label| !seen.insert(label.as_str())) {
        Some(label) => Err(BindivError::Embedding(
            ErrorInfo::new("bindiv_stat.duplicate_label", "group labels must be unique")
                .with_context("label", label.clone()),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(value: f64) -> CellSummary {
        CellSummary::from_values(&[value])
    }

    #[test]
    fn reversed_pair_orientation_lands_in_the_same_cell() {
        let mut cells = BTreeMap::new();
        cells.insert(GroupPair::new("b", "a"), observed(0.75));
        let matrix =
            SimilarityMatrix::from_cells(vec!["a".into(), "b".into()], &cells).expect("matrix");
        assert_eq!(matrix.mean(0, 1), Some(0.75));
        assert_eq!(matrix.mean(1, 0), Some(0.75));
    }

    #[test]
    fn both_orientations_are_rejected() {
        let mut cells = BTreeMap::new();
        cells.insert(GroupPair::new("a", "b"), observed(0.75));
        cells.insert(GroupPair::new("b", "a"), observed(0.70));
        let err = SimilarityMatrix::from_cells(vec!["a".into(), "b".into()], &cells)
            .expect_err("duplicate");
        assert_eq!(err.info().code, "bindiv_stat.duplicate_cell");
    }

    #[test]
    fn annotation_marks_missing_cells() {
        let mut cells = BTreeMap::new();
        cells.insert(GroupPair::new("a", "b"), CellSummary::from_values(&[0.9, 0.8]));
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let table = SimilarityMatrix::from_cells(labels, &cells)
            .expect("matrix")
            .annotate();
        assert_eq!(table.rows[0][0], "0.00 ± 0.00");
        assert_eq!(table.rows[0][1], "85.00 ± 7.07");
        assert_eq!(table.rows[1][2], "- ± -");
    }

    #[test]
    fn rejects_asymmetric_rows() {
        let err = DistanceMatrix::new(
            vec!["a".into(), "b".into()],
            vec![vec![Some(0.0), Some(0.1)], vec![Some(0.2), Some(0.0)]],
        )
        .expect_err("asymmetric");
        assert_eq!(err.info().code, "bindiv_stat.matrix_symmetry");
    }
}
