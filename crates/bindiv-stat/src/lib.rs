#![deny(missing_docs)]
#![doc = "Order-independent aggregation, distance matrices and metric MDS for bindiv studies."]

/// Sample stores and the aggregator.
pub mod aggregate;
/// Histograms and quantiles of similarity samples.
pub mod distribution;
/// Per-function stability analysis.
pub mod functions;
/// Similarity and distance matrices.
pub mod matrix;
/// Metric multidimensional scaling.
pub mod mds;

pub use aggregate::{Aggregator, CellStats, CellSummary, MemoryStore, SampleStore};
pub use distribution::{Histogram, Quantiles, ScoreDistribution, SIMILARITY_BINS};
pub use functions::{FunctionAnalysis, DEFAULT_STABLE_THRESHOLD};
pub use matrix::{AnnotatedMatrix, DistanceMatrix, SimilarityMatrix, MATRIX_TOLERANCE};
pub use mds::{embed, EmbeddedPoint, Embedding, EmbeddingOpts, EmbeddingOutcome, MissingPolicy};
