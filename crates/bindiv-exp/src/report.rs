use std::collections::BTreeMap;
use std::path::PathBuf;

use bindiv_core::{ComparisonPair, GroupPair};
use bindiv_diff::Extraction;
use bindiv_stat::{
    AnnotatedMatrix, CellSummary, DistanceMatrix, EmbeddingOutcome, FunctionAnalysis,
    MissingPolicy, ScoreDistribution, SimilarityMatrix,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::DiscoveryIssue;
use crate::schedule::{SchedulePolicy, SkippedName};

/// Final classification of one scheduled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairStatus {
    /// Tool succeeded and at least one similarity was extracted.
    Succeeded,
    /// Tool failed, timed out or could not be started.
    ToolFailed,
    /// Tool exited cleanly but no usable similarity was found.
    NoResult,
}

impl PairStatus {
    /// Stable lowercase name used in CSV exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            PairStatus::Succeeded => "succeeded",
            PairStatus::ToolFailed => "tool-failed",
            PairStatus::NoResult => "no-result",
        }
    }
}

/// Report entry for one scheduled pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOutcome {
    /// Position in the schedule.
    pub index: usize,
    /// Stable pair identifier used for output names.
    pub pair_id: String,
    /// The compared artifacts.
    pub pair: ComparisonPair,
    /// Classification of the pair.
    pub status: PairStatus,
    /// Number of similarity observations contributed to the aggregates.
    pub observations: usize,
    /// Mean of the contributed observations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_similarity: Option<f64>,
    /// Diagnostic for a non-success status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Persisted structured result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,
    /// Persisted log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

/// Aggregate counts reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunSummary {
    /// Readable variant groups.
    pub groups: usize,
    /// Pairs in the schedule.
    pub scheduled: usize,
    /// Pairs that contributed observations.
    pub succeeded: usize,
    /// Pairs whose tool invocation failed.
    pub tool_failed: usize,
    /// Pairs without a usable result.
    pub no_result: usize,
    /// Names that could not be scheduled.
    pub skipped_names: usize,
    /// Variant roots that could not be scanned.
    pub skipped_groups: usize,
    /// Group pairs without any observation.
    pub missing_cells: usize,
}

impl RunSummary {
    /// Tallies pair statuses.
    pub fn from_outcomes(outcomes: &[PairOutcome]) -> Self {
        let mut summary = Self {
            scheduled: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.status {
                PairStatus::Succeeded => summary.succeeded += 1,
                PairStatus::ToolFailed => summary.tool_failed += 1,
                PairStatus::NoResult => summary.no_result += 1,
            }
        }
        summary
    }
}

/// Finalised statistics of one group pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCell {
    /// Group pair (lower plan index first).
    pub pair: GroupPair,
    /// Aggregate over every observation of the pair.
    pub summary: CellSummary,
}

/// Complete outcome of a study run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    /// Hash of the plan that produced the report.
    pub plan_hash: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Scheduling policy in effect.
    pub policy: SchedulePolicy,
    /// Extraction mode in effect.
    pub extraction: Extraction,
    /// Missing-cell policy applied by the embedding.
    pub missing: MissingPolicy,
    /// Run counters.
    pub summary: RunSummary,
    /// Skipped variant roots.
    pub discovery_issues: Vec<DiscoveryIssue>,
    /// Names that could not be scheduled.
    pub skipped: Vec<SkippedName>,
    /// Per-pair outcomes in schedule order.
    pub pairs: Vec<PairOutcome>,
    /// Per-group-pair statistics.
    pub pair_stats: Vec<PairCell>,
    /// Per-function statistics across all pairs (structured extraction only).
    pub function_stats: BTreeMap<String, CellSummary>,
    /// Stability classification of the per-function statistics.
    pub functions: FunctionAnalysis,
    /// Similarity distribution per primary group label.
    pub distributions: BTreeMap<String, ScoreDistribution>,
    /// Symmetric similarity matrix.
    pub similarity: SimilarityMatrix,
    /// Derived distance matrix.
    pub distance: DistanceMatrix,
    /// `mean ± std` presentation of the similarity matrix.
    pub annotated: AnnotatedMatrix,
    /// Two dimensional embedding or the reason it was refused.
    pub embedding: EmbeddingOutcome,
}

/// Statistical payload assembled by the aggregation pass.
#[derive(Debug, Clone)]
pub(crate) struct StudyStats {
    pub pair_stats: Vec<PairCell>,
    pub function_stats: BTreeMap<String, CellSummary>,
    pub functions: FunctionAnalysis,
    pub distributions: BTreeMap<String, ScoreDistribution>,
    pub similarity: SimilarityMatrix,
    pub distance: DistanceMatrix,
    pub embedding: EmbeddingOutcome,
}

/// Plan-level facts copied into the report.
#[derive(Debug, Clone)]
pub(crate) struct StudyContext {
    pub plan_hash: String,
    pub policy: SchedulePolicy,
    pub extraction: Extraction,
    pub missing: MissingPolicy,
    pub groups: usize,
    pub discovery_issues: Vec<DiscoveryIssue>,
    pub skipped: Vec<SkippedName>,
}

impl StudyReport {
    pub(crate) fn new(context: StudyContext, pairs: Vec<PairOutcome>, stats: StudyStats) -> Self {
        let mut summary = RunSummary::from_outcomes(&pairs);
        summary.groups = context.groups;
        summary.skipped_names = context.skipped.len();
        summary.skipped_groups = context.discovery_issues.len();
        summary.missing_cells = stats.similarity.missing_pairs().len();
        let annotated = stats.similarity.annotate();
        Self {
            plan_hash: context.plan_hash,
            created_at: Utc::now().to_rfc3339(),
            policy: context.policy,
            extraction: context.extraction,
            missing: context.missing,
            summary,
            discovery_issues: context.discovery_issues,
            skipped: context.skipped,
            pairs,
            pair_stats: stats.pair_stats,
            function_stats: stats.function_stats,
            functions: stats.functions,
            distributions: stats.distributions,
            similarity: stats.similarity,
            distance: stats.distance,
            annotated,
            embedding: stats.embedding,
        }
    }
}
