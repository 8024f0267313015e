use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::CellSummary;

/// Default spread below which a function counts as stable.
pub const DEFAULT_STABLE_THRESHOLD: f64 = 0.005;

/// Classification of per-function similarity summaries across all pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    /// Threshold applied to the standard deviation.
    pub threshold: f64,
    /// Functions with at least two observations and `std_dev <= threshold`.
    pub stable: Vec<String>,
    /// Functions with at least two observations and `std_dev > threshold`.
    pub variable: Vec<String>,
    /// Functions observed only once; their spread is undefined.
    pub single_observation: Vec<String>,
    /// Functions whose similarity was exactly 1.0 in every observation.
    pub always_identical: Vec<String>,
    /// Count, mean and spread of the per-function standard deviations.
    pub spread_summary: CellSummary,
}

impl FunctionAnalysis {
    /// Classifies finalised per-function summaries (keyed by function name).
    pub fn classify(summaries: &BTreeMap<String, CellSummary>, threshold: f64) -> Self {
        let mut stable = Vec::new();
        let mut variable = Vec::new();
        let mut single_observation = Vec::new();
        let mut always_identical = Vec::new();
        let mut spreads = Vec::new();

        for (name, summary) in summaries {
            let Some(stats) = summary.stats() else {
                continue;
            };
            if stats.min >= 1.0 {
                always_identical.push(name.clone());
            }
            match stats.std_dev {
                Some(std) => {
                    spreads.push(std);
                    if std <= threshold {
                        stable.push(name.clone());
                    } else {
                        variable.push(name.clone());
                    }
                }
                None => single_observation.push(name.clone()),
            }
        }

        Self {
            threshold,
            stable,
            variable,
            single_observation,
            always_identical,
            spread_summary: CellSummary::from_values(&spreads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_spread_and_identity() {
        let mut summaries = BTreeMap::new();
        summaries.insert("main".to_string(), CellSummary::from_values(&[1.0, 1.0, 1.0]));
        summaries.insert("parse".to_string(), CellSummary::from_values(&[0.5, 0.7]));
        summaries.insert("init".to_string(), CellSummary::from_values(&[0.9]));
        summaries.insert("gone".to_string(), CellSummary::NoData);

        let analysis = FunctionAnalysis::classify(&summaries, DEFAULT_STABLE_THRESHOLD);
        assert_eq!(analysis.stable, vec!["main"]);
        assert_eq!(analysis.variable, vec!["parse"]);
        assert_eq!(analysis.single_observation, vec!["init"]);
        assert_eq!(analysis.always_identical, vec!["main"]);
        assert_eq!(analysis.spread_summary.count(), 2);
    }
}
