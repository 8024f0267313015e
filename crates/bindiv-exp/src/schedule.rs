use bindiv_core::ComparisonPair;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// How comparison pairs are enumerated from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulePolicy {
    /// Every name common to all groups, compared across every unordered group pair.
    #[default]
    AllPairsOfGroups,
    /// Artifacts grouped by name; every unordered combination of the groups holding it.
    GroupedByBaseName,
}

/// A logical name that produced no comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedName {
    /// Artifact name.
    pub name: String,
    /// Labels of the groups holding the name.
    pub groups: Vec<String>,
}

/// Deterministically ordered list of comparisons for one study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schedule {
    /// Pairs ordered by (primary label, secondary label, artifact name).
    pub pairs: Vec<ComparisonPair>,
    /// Names left out of the schedule.
    pub skipped: Vec<SkippedName>,
}

impl Schedule {
    /// Number of scheduled pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when nothing was scheduled.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Enumerates the comparisons for `catalog` under `policy`.
///
/// No unordered pair is ever emitted twice: groups are combined with `i < j`
/// and each name is visited once.
pub fn build_schedule(catalog: &Catalog, policy: SchedulePolicy) -> Schedule {
    let membership = catalog.membership();
    let group_count = catalog.groups.len();
    let mut schedule = Schedule::default();

    for (name, slots) in &membership {
        let eligible = match policy {
            SchedulePolicy::AllPairsOfGroups => slots.len() == group_count && group_count >= 2,
            SchedulePolicy::GroupedByBaseName => slots.len() >= 2,
        };
        if !eligible {
            schedule.skipped.push(SkippedName {
                name: name.clone(),
                groups: slots
                    .iter()
                    .map(|&slot| catalog.groups[slot].group.label.clone())
                    .collect(),
            });
            continue;
        }
        for (offset, &i) in slots.iter().enumerate() {
            for &j in &slots[offset + 1..] {
                let a = catalog.groups[i].group.artifact(name);
                let b = catalog.groups[j].group.artifact(name);
                schedule.pairs.push(ComparisonPair::new(a, b));
            }
        }
    }

    schedule.pairs.sort_by(|a, b| {
        a.primary
            .group_label
            .cmp(&b.primary.group_label)
            .then_with(|| a.secondary.group_label.cmp(&b.secondary.group_label))
            .then_with(|| a.primary.name.cmp(&b.primary.name))
            .then_with(|| a.secondary.name.cmp(&b.secondary.name))
    });
    schedule
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use bindiv_core::VariantGroup;

    use super::*;
    use crate::catalog::GroupArtifacts;

    fn catalog(groups: &[(&str, &[&str])]) -> Catalog {
        Catalog {
            groups: groups
                .iter()
                .enumerate()
                .map(|(index, (label, names))| GroupArtifacts {
                    group: VariantGroup::new(index, *label, format!("/builds/{label}")),
                    names: names.iter().map(|name| name.to_string()).collect::<BTreeSet<_>>(),
                })
                .collect(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn all_pairs_skips_names_missing_from_a_group() {
        let catalog = catalog(&[
            ("a", &["ls.BinExport", "cp.BinExport"]),
            ("b", &["ls.BinExport", "cp.BinExport"]),
            ("c", &["ls.BinExport"]),
        ]);
        let schedule = build_schedule(&catalog, SchedulePolicy::AllPairsOfGroups);
        assert_eq!(schedule.len(), 3);
        assert!(schedule.pairs.iter().all(|pair| pair.primary.name == "ls.BinExport"));
        assert_eq!(schedule.skipped.len(), 1);
        assert_eq!(schedule.skipped[0].name, "cp.BinExport");
        assert_eq!(schedule.skipped[0].groups, vec!["a", "b"]);
    }

    #[test]
    fn grouped_policy_pairs_every_holder_of_a_name() {
        let catalog = catalog(&[
            ("a", &["ls.BinExport", "cp.BinExport", "mv.BinExport"]),
            ("b", &["ls.BinExport", "cp.BinExport"]),
            ("c", &["ls.BinExport"]),
        ]);
        let schedule = build_schedule(&catalog, SchedulePolicy::GroupedByBaseName);
        // ls: 3 combinations, cp: 1, mv: skipped
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule.skipped.len(), 1);
        assert_eq!(schedule.skipped[0].name, "mv.BinExport");

        let order: Vec<(String, String, String)> = schedule
            .pairs
            .iter()
            .map(|pair| {
                (
                    pair.primary.group_label.clone(),
                    pair.secondary.group_label.clone(),
                    pair.primary.name.clone(),
                )
            })
            .collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }
}
