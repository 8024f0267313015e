use std::collections::VecDeque;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matrix::DistanceMatrix;

const COORD_EPSILON: f64 = 1e-9;
const STRESS_FLOOR: f64 = 1e-12;

/// How missing distance cells are handled before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPolicy {
    /// Any missing cell refuses the embedding.
    Refuse,
    /// Missing cells get zero weight; the observed pairs must connect every group.
    #[default]
    Exclude,
    /// Missing cells are imputed with the maximal distance 1.0.
    MaxDistance,
}

/// Options for [`embed`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOpts {
    /// Output dimensionality.
    pub dims: usize,
    /// SMACOF iteration cap.
    pub max_iter: usize,
    /// Relative stress improvement below which iteration stops.
    pub tolerance: f64,
    /// Handling of missing cells.
    pub missing: MissingPolicy,
}

impl Default for EmbeddingOpts {
    fn default() -> Self {
        Self {
            dims: 2,
            max_iter: 300,
            tolerance: 1e-6,
            missing: MissingPolicy::Exclude,
        }
    }
}

/// Coordinates of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedPoint {
    /// Group label.
    pub label: String,
    /// Coordinates, one per output dimension.
    pub coords: Vec<f64>,
}

/// Result of a successful embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// One point per group, in matrix order.
    pub points: Vec<EmbeddedPoint>,
    /// Weighted raw stress of the final configuration.
    pub stress: f64,
    /// Stress normalised by the weighted sum of squared distances (Kruskal stress-1).
    pub normalized_stress: f64,
    /// SMACOF iterations performed.
    pub iterations: usize,
    /// Cells imputed under [`MissingPolicy::MaxDistance`].
    pub imputed: usize,
    /// Cells given zero weight under [`MissingPolicy::Exclude`].
    pub excluded: usize,
}

/// Embedding result, or the reason it was not computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum EmbeddingOutcome {
    /// Coordinates were produced.
    Embedded(Embedding),
    /// The matrix does not support a meaningful embedding.
    Refused {
        /// Human readable explanation.
        reason: String,
    },
}

impl EmbeddingOutcome {
    fn refused(reason: impl Into<String>) -> Self {
        EmbeddingOutcome::Refused {
            reason: reason.into(),
        }
    }

    /// The embedding, when one was produced.
    pub fn embedding(&self) -> Option<&Embedding> {
        match self {
            EmbeddingOutcome::Embedded(embedding) => Some(embedding),
            EmbeddingOutcome::Refused { .. } => None,
        }
    }
}

/// Metric MDS of `matrix`.
///
/// Classical scaling of a completed matrix seeds weighted SMACOF; missing
/// cells follow `opts.missing`. Degenerate input is refused rather than
/// embedded.
pub fn embed(matrix: &DistanceMatrix, opts: &EmbeddingOpts) -> EmbeddingOutcome {
    let n = matrix.len();
    if n < 2 {
        return EmbeddingOutcome::refused(format!(
            "insufficient data: {n} group(s), at least two are required"
        ));
    }
    if opts.dims == 0 {
        return EmbeddingOutcome::refused("embedding needs at least one dimension");
    }

    let mut targets = DMatrix::<f64>::zeros(n, n);
    let mut weights = DMatrix::<f64>::zeros(n, n);
    let mut missing = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            match matrix.get(i, j) {
                Some(value) => {
                    targets[(i, j)] = value;
                    weights[(i, j)] = 1.0;
                }
                None => {
                    if i < j {
                        missing += 1;
                    }
                }
            }
        }
    }

    let mut imputed = 0;
    let mut excluded = 0;
    if missing > 0 {
        match opts.missing {
            MissingPolicy::Refuse => {
                return EmbeddingOutcome::refused(format!(
                    "{missing} missing distance cell(s) and the missing policy is refuse"
                ));
            }
            MissingPolicy::MaxDistance => {
                for i in 0..n {
                    for j in 0..n {
                        if i != j && weights[(i, j)] == 0.0 {
                            targets[(i, j)] = 1.0;
                            weights[(i, j)] = 1.0;
                        }
                    }
                }
                imputed = missing;
            }
            MissingPolicy::Exclude => {
                if !is_connected(&weights) {
                    return EmbeddingOutcome::refused(
                        "observed pairs do not connect every group; cannot place all groups",
                    );
                }
                excluded = missing;
            }
        }
    }

    let observed_scale: f64 = weighted_sum(&weights, |i, j| targets[(i, j)].powi(2));
    if observed_scale <= STRESS_FLOOR {
        return EmbeddingOutcome::refused(
            "insufficient data: every observed off-diagonal distance is zero",
        );
    }

    let mut coords = classical_seed(&targets, &weights, opts.dims);
    if coords.norm() <= COORD_EPSILON {
        return EmbeddingOutcome::refused("classical scaling produced a degenerate configuration");
    }

    let Some(pseudo_inverse) = guttman_pseudo_inverse(&weights) else {
        return EmbeddingOutcome::refused("weight matrix is singular; cannot run SMACOF");
    };

    let mut current = stress(&coords, &targets, &weights);
    let mut iterations = 0;
    while iterations < opts.max_iter && current > STRESS_FLOOR {
        let b = guttman_b(&coords, &targets, &weights);
        let next = &pseudo_inverse * b * &coords;
        let next_stress = stress(&next, &targets, &weights);
        iterations += 1;
        let improvement = (current - next_stress) / current.max(STRESS_FLOOR);
        coords = next;
        current = next_stress;
        if improvement < opts.tolerance {
            break;
        }
    }
    debug!(groups = n, iterations, stress = current, "smacof finished");

    center_columns(&mut coords);
    normalize_signs(&mut coords);

    let points = matrix
        .labels()
        .iter()
        .enumerate()
        .map(|(row, label)| EmbeddedPoint {
            label: label.clone(),
            coords: coords.row(row).iter().map(|value| clean(*value)).collect(),
        })
        .collect();
    EmbeddingOutcome::Embedded(Embedding {
        points,
        stress: current,
        normalized_stress: (current / observed_scale).sqrt(),
        iterations,
        imputed,
        excluded,
    })
}

fn weighted_sum<F>(weights: &DMatrix<f64>, term: F) -> f64
where
    F: Fn(usize, usize) -> f64,
{
    let n = weights.nrows();
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            if weights[(i, j)] > 0.0 {
                total += weights[(i, j)] * term(i, j);
            }
        }
    }
    total
}

fn is_connected(weights: &DMatrix<f64>) -> bool {
    let n = weights.nrows();
    let mut visited = vec![false; n];
    let mut queue = VecDeque::from([0usize]);
    visited[0] = true;
    while let Some(node) = queue.pop_front() {
        for next in 0..n {
            if !visited[next] && weights[(node, next)] > 0.0 {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    visited.into_iter().all(|seen| seen)
}

/// Torgerson scaling on a completed copy of the targets.
fn classical_seed(targets: &DMatrix<f64>, weights: &DMatrix<f64>, dims: usize) -> DMatrix<f64> {
    let n = targets.nrows();
    let observed: Vec<f64> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .filter(|&(i, j)| weights[(i, j)] > 0.0)
        .map(|(i, j)| targets[(i, j)])
        .collect();
    let fill = observed.iter().sum::<f64>() / observed.len().max(1) as f64;

    let mut squared = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let value = if weights[(i, j)] > 0.0 {
                    targets[(i, j)]
                } else {
                    fill
                };
                squared[(i, j)] = value * value;
            }
        }
    }
    let centering =
        DMatrix::<f64>::identity(n, n) - DMatrix::<f64>::from_element(n, n, 1.0 / n as f64);
    let gram = &centering * squared * &centering * -0.5;
    let eigen = SymmetricEigen::new(gram);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut coords = DMatrix::<f64>::zeros(n, dims);
    for (axis, &index) in order.iter().take(dims).enumerate() {
        let scale = eigen.eigenvalues[index].max(0.0).sqrt();
        for row in 0..n {
            coords[(row, axis)] = eigen.eigenvectors[(row, index)] * scale;
        }
    }
    coords
}

/// `(V + 11ᵀ/n)⁻¹ - 11ᵀ/n` for the weighted Laplacian `V`.
fn guttman_pseudo_inverse(weights: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = weights.nrows();
    let mut laplacian = -weights.clone();
    for i in 0..n {
        laplacian[(i, i)] = weights.row(i).iter().sum::<f64>();
    }
    let ones = DMatrix::<f64>::from_element(n, n, 1.0 / n as f64);
    let inverse = (laplacian + &ones).try_inverse()?;
    Some(inverse - ones)
}

fn guttman_b(
    coords: &DMatrix<f64>,
    targets: &DMatrix<f64>,
    weights: &DMatrix<f64>,
) -> DMatrix<f64> {
    let n = coords.nrows();
    let mut b = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j || weights[(i, j)] == 0.0 {
                continue;
            }
            let distance = (coords.row(i) - coords.row(j)).norm();
            if distance > COORD_EPSILON {
                b[(i, j)] = -weights[(i, j)] * targets[(i, j)] / distance;
            }
        }
    }
    for i in 0..n {
        b[(i, i)] = -b.row(i).iter().sum::<f64>();
    }
    b
}

fn stress(coords: &DMatrix<f64>, targets: &DMatrix<f64>, weights: &DMatrix<f64>) -> f64 {
    weighted_sum(weights, |i, j| {
        let distance = (coords.row(i) - coords.row(j)).norm();
        (targets[(i, j)] - distance).powi(2)
    })
}

fn center_columns(coords: &mut DMatrix<f64>) {
    let n = coords.nrows() as f64;
    for mut column in coords.column_iter_mut() {
        let mean = column.sum() / n;
        column.add_scalar_mut(-mean);
    }
}

fn normalize_signs(coords: &mut DMatrix<f64>) {
    for mut column in coords.column_iter_mut() {
        let leading = column.iter().copied().find(|value| value.abs() > COORD_EPSILON);
        if leading.is_some_and(|value| value < 0.0) {
            column.neg_mut();
        }
    }
}

fn clean(value: f64) -> f64 {
    if value.abs() <= COORD_EPSILON {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_observations_are_refused_under_exclude() {
        let labels = ["a", "b", "c", "d"].map(String::from).to_vec();
        let rows = vec![
            vec![Some(0.0), Some(0.2), None, None],
            vec![Some(0.2), Some(0.0), None, None],
            vec![None, None, Some(0.0), Some(0.3)],
            vec![None, None, Some(0.3), Some(0.0)],
        ];
        let matrix = DistanceMatrix::new(labels, rows).expect("matrix");
        let outcome = embed(&matrix, &EmbeddingOpts::default());
        assert!(matches!(outcome, EmbeddingOutcome::Refused { .. }));
    }

    #[test]
    fn pseudo_inverse_satisfies_moore_penrose_identity() {
        let mut weights = DMatrix::<f64>::from_element(3, 3, 1.0);
        weights.fill_diagonal(0.0);
        weights[(0, 2)] = 0.0;
        weights[(2, 0)] = 0.0;
        let pinv = guttman_pseudo_inverse(&weights).expect("invertible");
        let mut laplacian = -weights.clone();
        for i in 0..3 {
            laplacian[(i, i)] = weights.row(i).sum();
        }
        let roundtrip = &laplacian * &pinv * &laplacian;
        assert!((roundtrip - laplacian).norm() < 1e-9);
    }
}
