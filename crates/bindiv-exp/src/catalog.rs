use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use bindiv_core::VariantGroup;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Artifacts discovered below one readable variant root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupArtifacts {
    /// The group that was scanned.
    pub group: VariantGroup,
    /// Logical artifact names (file names) carrying the recognised extension.
    pub names: BTreeSet<String>,
}

/// A variant root that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryIssue {
    /// Label of the skipped group.
    pub label: String,
    /// Root that was attempted.
    pub root: PathBuf,
    /// Why the root was skipped.
    pub message: String,
}

/// Result of scanning every variant root of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Catalog {
    /// Readable groups, in plan order.
    pub groups: Vec<GroupArtifacts>,
    /// Groups that were skipped.
    pub issues: Vec<DiscoveryIssue>,
}

impl Catalog {
    /// Names present in every readable group; empty when no group is readable.
    pub fn common(&self) -> BTreeSet<String> {
        let mut groups = self.groups.iter();
        let Some(first) = groups.next() else {
            return BTreeSet::new();
        };
        groups.fold(first.names.clone(), |common, group| {
            common.intersection(&group.names).cloned().collect()
        })
    }

    /// Every discovered name with the indices (into [`Catalog::groups`]) holding it.
    pub fn membership(&self) -> BTreeMap<String, Vec<usize>> {
        let mut membership: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (slot, group) in self.groups.iter().enumerate() {
            for name in &group.names {
                membership.entry(name.clone()).or_default().push(slot);
            }
        }
        membership
    }

    /// Labels of the readable groups, in plan order.
    pub fn labels(&self) -> Vec<String> {
        self.groups
            .iter()
            .map(|entry| entry.group.label.clone())
            .collect()
    }
}

/// Scans each group root (non-recursively) for files carrying `extension`.
///
/// Missing or unreadable roots are skipped with a [`DiscoveryIssue`] rather
/// than aborting the scan.
pub fn build_catalog(groups: &[VariantGroup], extension: &str) -> Catalog {
    let extension = extension.trim_start_matches('.');
    let mut catalog = Catalog::default();
    for group in groups {
        match scan_root(group, extension) {
            Ok(names) => {
                debug!(label = %group.label, artifacts = names.len(), "scanned variant root");
                catalog.groups.push(GroupArtifacts {
                    group: group.clone(),
                    names,
                });
            }
            Err(message) => {
                warn!(
                    label = %group.label,
                    root = %group.root.display(),
                    %message,
                    "skipping variant root"
                );
                catalog.issues.push(DiscoveryIssue {
                    label: group.label.clone(),
                    root: group.root.clone(),
                    message,
                });
            }
        }
    }
    catalog
}

fn scan_root(group: &VariantGroup, extension: &str) -> Result<BTreeSet<String>, String> {
    if !group.root.is_dir() {
        return Err("root is missing or not a directory".to_string());
    }
    let mut names = BTreeSet::new();
    for entry in WalkDir::new(&group.root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.map_err(|err| err.to_string())?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}
