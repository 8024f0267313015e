use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::hash::stable_hash_string;
use bindiv_core::serde::{from_yaml_slice, to_yaml_string};
use bindiv_core::VariantGroup;
use bindiv_diff::{Extraction, ToolSpec};
use bindiv_stat::{MissingPolicy, DEFAULT_STABLE_THRESHOLD};
use serde::{Deserialize, Serialize};

use crate::schedule::SchedulePolicy;

fn io_error(code: &str, path: &Path, err: impl ToString) -> BindivError {
    BindivError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn config_error(code: &str, message: &str) -> BindivError {
    BindivError::Config(ErrorInfo::new(code, message))
}

/// One variant group entry of a study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Unique label used in matrices, file names and reports.
    pub label: String,
    /// Directory holding the group's artifacts (relative to the plan file).
    pub root: PathBuf,
}

/// Declarative description of a comparison study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    /// Variant groups in matrix order.
    pub groups: Vec<GroupSpec>,
    /// Recognised artifact extension, without the leading dot.
    #[serde(default = "StudyPlan::default_extension")]
    pub extension: String,
    /// Pair scheduling policy.
    #[serde(default)]
    pub policy: SchedulePolicy,
    /// Which part of each diff result feeds the aggregator.
    #[serde(default)]
    pub extraction: Extraction,
    /// External tool command line contract.
    #[serde(default)]
    pub tool: ToolSpec,
    /// Missing-cell handling for the embedding step.
    #[serde(default)]
    pub missing: MissingPolicy,
    /// Per-function spread at or below which a function is reported as stable.
    #[serde(default = "StudyPlan::default_stable_threshold")]
    pub stable_threshold: f64,
    /// Directory containing the plan on disk (ignored when serializing).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl StudyPlan {
    fn default_extension() -> String {
        "BinExport".to_string()
    }

    fn default_stable_threshold() -> f64 {
        DEFAULT_STABLE_THRESHOLD
    }

    /// Creates a plan with default settings for the given groups.
    pub fn new(groups: Vec<GroupSpec>) -> Self {
        Self {
            groups,
            extension: Self::default_extension(),
            policy: SchedulePolicy::default(),
            extraction: Extraction::default(),
            tool: ToolSpec::default(),
            missing: MissingPolicy::default(),
            stable_threshold: Self::default_stable_threshold(),
            base_dir: PathBuf::from("."),
        }
    }

    /// Checks structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), BindivError> {
        if self.groups.len() < 2 {
            return Err(BindivError::Config(
                ErrorInfo::new("bindiv_exp.plan_groups", "a study needs at least two groups")
                    .with_context("groups", self.groups.len().to_string()),
            ));
        }
        let mut labels = BTreeSet::new();
        for group in &self.groups {
            if group.label.trim().is_empty() {
                return Err(config_error(
                    "bindiv_exp.plan_label",
                    "group labels must not be empty",
                ));
            }
            if !labels.insert(group.label.as_str()) {
                return Err(BindivError::Config(
                    ErrorInfo::new("bindiv_exp.plan_label", "group labels must be unique")
                        .with_context("label", group.label.clone()),
                ));
            }
        }
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains('/') {
            return Err(BindivError::Config(
                ErrorInfo::new(
                    "bindiv_exp.plan_extension",
                    "artifact extension must be a bare file extension",
                )
                .with_context("extension", self.extension.clone()),
            ));
        }
        if !self.stable_threshold.is_finite() || self.stable_threshold < 0.0 {
            return Err(config_error(
                "bindiv_exp.plan_threshold",
                "stable_threshold must be a non-negative number",
            ));
        }
        self.tool.validate()
    }

    /// Returns the deterministic hash associated with the plan contents.
    pub fn plan_hash(&self) -> Result<String, BindivError> {
        stable_hash_string(self)
    }

    /// Produces a canonical YAML representation of the plan.
    pub fn to_yaml_string(&self) -> Result<String, BindivError> {
        to_yaml_string(self)
    }

    /// Artifact extension without a leading dot.
    pub fn artifact_extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    /// Resolves a plan-relative path against the plan's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Variant groups with resolved roots, indexed in plan order.
    pub fn variant_groups(&self) -> Vec<VariantGroup> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, group)| VariantGroup::new(index, &group.label, self.resolve(&group.root)))
            .collect()
    }

    /// Group labels in plan order.
    pub fn labels(&self) -> Vec<String> {
        self.groups.iter().map(|group| group.label.clone()).collect()
    }
}

/// Loads and validates a plan from disk.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<StudyPlan, BindivError> {
    let plan_path = path.as_ref();
    let bytes =
        fs::read(plan_path).map_err(|err| io_error("bindiv_exp.plan_read", plan_path, err))?;
    let mut plan: StudyPlan = from_yaml_slice(&bytes)?;
    plan.base_dir = plan_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> Vec<GroupSpec> {
        vec![
            GroupSpec {
                label: "gcc".into(),
                root: "builds/gcc/bin".into(),
            },
            GroupSpec {
                label: "clang".into(),
                root: "/abs/clang/bin".into(),
            },
        ]
    }

    #[test]
    fn minimal_yaml_takes_defaults() {
        let yaml = b"groups:\n  - { label: a, root: a/bin }\n  - { label: b, root: b/bin }\n";
        let plan: StudyPlan = from_yaml_slice(yaml).expect("plan");
        plan.validate().expect("valid");
        assert_eq!(plan.extension, "BinExport");
        assert_eq!(plan.policy, SchedulePolicy::AllPairsOfGroups);
        assert_eq!(plan.extraction, Extraction::LogText);
        assert_eq!(plan.missing, MissingPolicy::Exclude);
        assert_eq!(plan.stable_threshold, 0.005);
        assert_eq!(plan.tool, ToolSpec::default());
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut groups = two_groups();
        groups[1].label = "gcc".into();
        let err = StudyPlan::new(groups).validate().expect_err("duplicate");
        assert_eq!(err.info().code, "bindiv_exp.plan_label");
    }

    #[test]
    fn roots_resolve_against_the_plan_directory() {
        let mut plan = StudyPlan::new(two_groups());
        plan.base_dir = PathBuf::from("/studies/s1");
        let groups = plan.variant_groups();
        assert_eq!(groups[0].root, PathBuf::from("/studies/s1/builds/gcc/bin"));
        assert_eq!(groups[1].root, PathBuf::from("/abs/clang/bin"));
        assert_eq!(groups[1].index, 1);
    }

    #[test]
    fn hash_ignores_base_dir() {
        let mut first = StudyPlan::new(two_groups());
        let mut second = first.clone();
        first.base_dir = PathBuf::from("/a");
        second.base_dir = PathBuf::from("/b");
        assert_eq!(first.plan_hash().expect("hash"), second.plan_hash().expect("hash"));
    }
}
