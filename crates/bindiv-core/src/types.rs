use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{BindivError, ErrorInfo};
use crate::hash::hash_parts;

/// One compiled configuration of the project under study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantGroup {
    /// Position of the group in the study plan; defines matrix ordering.
    pub index: usize,
    /// Unique human readable label (for example `gcc-9-O3`).
    pub label: String,
    /// Directory holding the group's artifacts.
    pub root: PathBuf,
}

impl VariantGroup {
    /// Creates a new group descriptor.
    pub fn new(index: usize, label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            index,
            label: label.into(),
            root: root.into(),
        }
    }

    /// Returns the artifact with the given logical name inside this group.
    pub fn artifact(&self, name: &str) -> Artifact {
        Artifact {
            group_index: self.index,
            group_label: self.label.clone(),
            name: name.to_string(),
            path: self.root.join(name),
        }
    }
}

/// A comparable unit belonging to exactly one variant group.
///
/// The key is `(group_label, name)`; the logical name must match across
/// groups for two artifacts to be comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Index of the owning group in the study plan.
    pub group_index: usize,
    /// Label of the owning group.
    pub group_label: String,
    /// Logical name shared across groups (file name including extension).
    pub name: String,
    /// Location of the artifact on disk.
    pub path: PathBuf,
}

impl Artifact {
    /// Logical name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// Unordered pair of group labels, stored with the lower plan index first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupPair {
    /// Label of the group with the lower plan index.
    pub primary: String,
    /// Label of the group with the higher plan index.
    pub secondary: String,
}

impl GroupPair {
    /// Creates a group pair from two labels.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

impl Display for GroupPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.primary, self.secondary)
    }
}

/// Two artifacts scheduled for a single diff invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    /// Artifact passed to the tool as the primary input.
    pub primary: Artifact,
    /// Artifact passed to the tool as the secondary input.
    pub secondary: Artifact,
}

impl ComparisonPair {
    /// Creates a pair, placing the artifact with the lower group index first.
    pub fn new(a: Artifact, b: Artifact) -> Self {
        if (b.group_index, &b.group_label) < (a.group_index, &a.group_label) {
            Self {
                primary: b,
                secondary: a,
            }
        } else {
            Self {
                primary: a,
                secondary: b,
            }
        }
    }

    /// Group pair this comparison contributes to.
    pub fn group_pair(&self) -> GroupPair {
        GroupPair::new(&self.primary.group_label, &self.secondary.group_label)
    }

    /// Collision free, filesystem safe identifier for the pair.
    ///
    /// Encodes both group labels and both artifact names, followed by a short
    /// digest of the full key so sanitised labels cannot alias each other.
    pub fn id(&self) -> String {
        let digest = hash_parts(&[
            &self.primary.group_label,
            &self.primary.name,
            &self.secondary.group_label,
            &self.secondary.name,
        ]);
        format!(
            "{}_{}_vs_{}_{}-{}",
            sanitize(&self.primary.group_label),
            sanitize(self.primary.stem()),
            sanitize(&self.secondary.group_label),
            sanitize(self.secondary.stem()),
            &digest[..8]
        )
    }
}

impl Display for ComparisonPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} vs {}/{}",
            self.primary.group_label,
            self.primary.name,
            self.secondary.group_label,
            self.secondary.name
        )
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

/// Similarity on the canonical fractional scale `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Similarity(f64);

impl Similarity {
    /// Values this far outside `[0, 1]` are clamped instead of rejected.
    pub const TOLERANCE: f64 = 1e-9;

    /// Accepts a fraction in `[0, 1]` (structured result encoding).
    pub fn from_fraction(value: f64) -> Result<Self, BindivError> {
        if !value.is_finite() || value < -Self::TOLERANCE || value > 1.0 + Self::TOLERANCE {
            return Err(BindivError::ResultParse(
                ErrorInfo::new(
                    "bindiv_core.similarity_range",
                    "similarity outside the [0, 1] range",
                )
                .with_context("value", value.to_string()),
            ));
        }
        Ok(Self(value.clamp(0.0, 1.0)))
    }

    /// Accepts a percentage in `[0, 100]` (log text encoding).
    pub fn from_percent(value: f64) -> Result<Self, BindivError> {
        Self::from_fraction(value / 100.0)
    }

    /// Value on the canonical `[0, 1]` scale.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Value expressed as a percentage.
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

/// Per-function similarity produced by a structured diff result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Function name in the primary artifact.
    pub function_name: String,
    /// Matched function name in the secondary artifact, when projected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    /// Normalised similarity of the match.
    pub similarity: Similarity,
}
