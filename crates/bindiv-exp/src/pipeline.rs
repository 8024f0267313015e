use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::{ComparisonPair, DiffStatus, Differ, GroupPair};
use bindiv_diff::{Extracted, Extraction};
use bindiv_stat::{
    embed, Aggregator, EmbeddingOpts, EmbeddingOutcome, FunctionAnalysis, ScoreDistribution,
    SimilarityMatrix,
};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::catalog::{build_catalog, Catalog};
use crate::export::write_exports;
use crate::plan::StudyPlan;
use crate::report::{PairCell, PairOutcome, PairStatus, StudyContext, StudyReport, StudyStats};
use crate::schedule::{build_schedule, Schedule};

fn io_error(code: &str, err: impl ToString) -> BindivError {
    BindivError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Options governing study execution.
#[derive(Debug, Clone)]
pub struct RunOpts {
    /// Number of pairs diffed in parallel.
    pub concurrency: usize,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Catalog and schedule of a plan, before any tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStudy {
    /// Discovered artifacts per readable group.
    pub catalog: Catalog,
    /// Ordered comparisons.
    pub schedule: Schedule,
}

/// Scans the plan's roots and schedules the comparisons.
///
/// Fails when fewer than two groups are readable or nothing can be compared.
pub fn prepare_study(plan: &StudyPlan) -> Result<PreparedStudy, BindivError> {
    let catalog = build_catalog(&plan.variant_groups(), plan.artifact_extension());
    if catalog.groups.len() < 2 {
        return Err(BindivError::Discovery(
            ErrorInfo::new(
                "bindiv_exp.too_few_groups",
                "fewer than two variant roots could be scanned",
            )
            .with_context("readable", catalog.groups.len().to_string())
            .with_context("skipped", catalog.issues.len().to_string()),
        ));
    }
    let schedule = build_schedule(&catalog, plan.policy);
    if schedule.is_empty() {
        return Err(BindivError::Discovery(
            ErrorInfo::new("bindiv_exp.empty_schedule", "no comparable artifacts were found")
                .with_context("extension", plan.artifact_extension().to_string())
                .with_hint("check the group roots and the artifact extension"),
        ));
    }
    Ok(PreparedStudy { catalog, schedule })
}

struct PairRun {
    outcome: PairOutcome,
    extracted: Option<Extracted>,
}

/// Executes a study: diff every scheduled pair, aggregate, build the matrices,
/// embed, and write the report and exports below `out`.
pub fn run_study(
    plan: &StudyPlan,
    differ: &dyn Differ,
    out: &Path,
    opts: &RunOpts,
) -> Result<StudyReport, BindivError> {
    fs::create_dir_all(out).map_err(|err| io_error("bindiv_exp.out_dir", err))?;
    let prepared = prepare_study(plan)?;
    let labels = prepared.catalog.labels();
    info!(
        groups = labels.len(),
        pairs = prepared.schedule.len(),
        skipped = prepared.schedule.skipped.len(),
        concurrency = opts.concurrency.max(1),
        "study scheduled"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .build()
        .map_err(|err| io_error("bindiv_exp.thread_pool", err))?;
    let mut runs: Vec<(usize, PairRun)> = pool.install(|| {
        prepared
            .schedule
            .pairs
            .par_iter()
            .enumerate()
            .map(|(index, pair)| (index, run_pair(index, pair, differ, plan.extraction, out)))
            .collect()
    });
    runs.sort_by_key(|(index, _)| *index);

    let stats = aggregate(plan, &labels, &runs)?;
    let outcomes: Vec<PairOutcome> = runs.into_iter().map(|(_, run)| run.outcome).collect();
    let context = StudyContext {
        plan_hash: plan.plan_hash()?,
        policy: plan.policy,
        extraction: plan.extraction,
        missing: plan.missing,
        groups: labels.len(),
        discovery_issues: prepared.catalog.issues,
        skipped: prepared.schedule.skipped,
    };
    let report = StudyReport::new(context, outcomes, stats);

    let summary = &report.summary;
    info!(
        scheduled = summary.scheduled,
        succeeded = summary.succeeded,
        tool_failed = summary.tool_failed,
        no_result = summary.no_result,
        skipped_names = summary.skipped_names,
        skipped_groups = summary.skipped_groups,
        missing_cells = summary.missing_cells,
        "study finished"
    );
    if let EmbeddingOutcome::Refused { reason } = &report.embedding {
        warn!(%reason, "cannot embed");
    }

    write_exports(&report, out)?;
    Ok(report)
}

fn run_pair(
    index: usize,
    pair: &ComparisonPair,
    differ: &dyn Differ,
    extraction: Extraction,
    out: &Path,
) -> PairRun {
    let result = differ.diff(pair, out);
    let mut outcome = PairOutcome {
        index,
        pair_id: pair.id(),
        pair: pair.clone(),
        status: PairStatus::NoResult,
        observations: 0,
        mean_similarity: None,
        detail: result.detail.clone(),
        result_path: result.result_path.clone(),
        log_path: result.log_path.clone(),
    };

    match result.status {
        DiffStatus::ToolError => {
            warn!(%pair, detail = ?result.detail, "diff tool failed; pair recorded as missing");
            outcome.status = PairStatus::ToolFailed;
            return PairRun {
                outcome,
                extracted: None,
            };
        }
        DiffStatus::NoResult => {
            warn!(%pair, detail = ?result.detail, "diff produced no result");
            return PairRun {
                outcome,
                extracted: None,
            };
        }
        DiffStatus::Success => {}
    }

    match extraction.extract(&result) {
        Ok(extracted) if extracted.observations() > 0 => {
            let values = observed_values(&extracted);
            outcome.status = PairStatus::Succeeded;
            outcome.observations = values.len();
            outcome.mean_similarity = Some(values.iter().sum::<f64>() / values.len() as f64);
            PairRun {
                outcome,
                extracted: Some(extracted),
            }
        }
        Ok(_) => {
            warn!(%pair, "no similarity found in diff output");
            outcome.detail = Some("no similarity found in diff output".to_string());
            PairRun {
                outcome,
                extracted: None,
            }
        }
        Err(err) => {
            warn!(%pair, error = %err, "diff result could not be parsed");
            outcome.detail = Some(err.to_string());
            PairRun {
                outcome,
                extracted: None,
            }
        }
    }
}

fn observed_values(extracted: &Extracted) -> Vec<f64> {
    match extracted {
        Extracted::Functions(records) => records
            .iter()
            .map(|record| record.similarity.value())
            .collect(),
        Extracted::Aggregate(value) => value.iter().map(|value| value.value()).collect(),
    }
}

/// Single aggregation pass over the outcomes in schedule order.
fn aggregate(
    plan: &StudyPlan,
    labels: &[String],
    runs: &[(usize, PairRun)],
) -> Result<StudyStats, BindivError> {
    let mut per_pair: Aggregator<GroupPair> = Aggregator::new();
    for (i, primary) in labels.iter().enumerate() {
        for secondary in &labels[i + 1..] {
            per_pair.register(GroupPair::new(primary, secondary));
        }
    }
    let mut per_function: Aggregator<String> = Aggregator::new();
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (_, run) in runs {
        let Some(extracted) = &run.extracted else {
            continue;
        };
        let pair = &run.outcome.pair;
        let key = pair.group_pair();
        let sample = samples.entry(pair.primary.group_label.clone()).or_default();
        match extracted {
            Extracted::Functions(records) => {
                for record in records {
                    let value = record.similarity.value();
                    per_pair.accumulate(key.clone(), value)?;
                    per_function.accumulate(record.function_name.clone(), value)?;
                    sample.push(value);
                }
            }
            Extracted::Aggregate(Some(similarity)) => {
                per_pair.accumulate(key, similarity.value())?;
                sample.push(similarity.value());
            }
            Extracted::Aggregate(None) => {}
        }
    }

    let pair_cells = per_pair.finalize();
    let similarity = SimilarityMatrix::from_cells(labels.to_vec(), &pair_cells)?;
    let distance = similarity.to_distance();
    let embedding = embed(
        &distance,
        &EmbeddingOpts {
            missing: plan.missing,
            ..EmbeddingOpts::default()
        },
    );
    let function_stats = per_function.finalize();
    let functions = FunctionAnalysis::classify(&function_stats, plan.stable_threshold);
    let distributions = samples
        .iter()
        .map(|(label, values)| (label.clone(), ScoreDistribution::from_values(values)))
        .collect();
    let pair_stats = pair_cells
        .into_iter()
        .map(|(pair, summary)| PairCell { pair, summary })
        .collect();

    Ok(StudyStats {
        pair_stats,
        function_stats,
        functions,
        distributions,
        similarity,
        distance,
        embedding,
    })
}
