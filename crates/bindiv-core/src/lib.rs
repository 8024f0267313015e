#![deny(missing_docs)]
#![doc = "Core data model, capability traits and errors shared by bindiv crates."]

/// Diff invocation contract.
pub mod diff;
/// Structured error surface.
pub mod errors;
/// Stable hashing helpers.
pub mod hash;
/// Canonical JSON and YAML helpers.
pub mod serde;
mod types;

pub use diff::{DiffResult, DiffStatus, Differ};
pub use errors::{BindivError, ErrorInfo};
pub use hash::{hash_parts, stable_hash_string};
pub use types::{
    Artifact, ComparisonPair, GroupPair, ScoreRecord, Similarity, VariantGroup,
};
