#![deny(missing_docs)]
#![doc = "Study plans, artifact discovery, pair scheduling and study orchestration."]

/// Variant root scanning.
pub mod catalog;
/// CSV and JSON exports of a study report.
pub mod export;
/// Study execution and the aggregation pass.
pub mod pipeline;
/// Plan loading and validation.
pub mod plan;
/// Study report types.
pub mod report;
/// Pair scheduling policies.
pub mod schedule;

pub use catalog::{build_catalog, Catalog, DiscoveryIssue, GroupArtifacts};
pub use export::{write_embedding_csv, write_exports, DISTANCE_JSON_FILE, REPORT_FILE};
pub use pipeline::{prepare_study, run_study, PreparedStudy, RunOpts};
pub use plan::{load_plan, GroupSpec, StudyPlan};
pub use report::{PairCell, PairOutcome, PairStatus, RunSummary, StudyReport};
pub use schedule::{build_schedule, Schedule, SchedulePolicy, SkippedName};
