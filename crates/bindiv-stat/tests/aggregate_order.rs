use std::collections::BTreeMap;

use bindiv_core::{GroupPair, ScoreRecord, Similarity};
use bindiv_stat::{Aggregator, CellSummary};
use proptest::prelude::*;

fn finalize(observations: &[(u8, f64)]) -> BTreeMap<u8, CellSummary> {
    let mut aggregator = Aggregator::new();
    for (key, value) in observations {
        aggregator.accumulate(*key, *value).unwrap();
    }
    aggregator.finalize()
}

fn records(rows: &[(&str, f64)]) -> Vec<ScoreRecord> {
    rows.iter()
        .map(|(name, value)| ScoreRecord {
            function_name: name.to_string(),
            matched_name: None,
            similarity: Similarity::from_fraction(*value).unwrap(),
        })
        .collect()
}

proptest! {
    #[test]
    fn finalize_ignores_accumulation_order(
        (original, shuffled) in prop::collection::vec((0u8..4, 0.0f64..=1.0), 1..48)
            .prop_flat_map(|obs| (Just(obs.clone()), Just(obs).prop_shuffle()))
    ) {
        prop_assert_eq!(finalize(&original), finalize(&shuffled));
    }
}

#[test]
fn per_function_round_trip_over_two_results() {
    let first = records(&[("f1", 1.0), ("f2", 0.5)]);
    let second = records(&[("f1", 1.0), ("f2", 0.7)]);

    let mut per_function: Aggregator<String> = Aggregator::new();
    for record in first.iter().chain(second.iter()) {
        per_function
            .accumulate(record.function_name.clone(), record.similarity.value())
            .unwrap();
    }
    let summaries = per_function.finalize();

    let f1 = summaries["f1"].stats().unwrap();
    assert_eq!(f1.count, 2);
    assert_eq!(f1.mean, 1.0);
    assert_eq!(f1.std_dev, Some(0.0));

    let f2 = summaries["f2"].stats().unwrap();
    assert_eq!(f2.count, 2);
    assert!((f2.mean - 0.6).abs() < 1e-12);
    assert!((f2.std_dev.unwrap() - 0.1414).abs() < 1e-4);
}

#[test]
fn group_pair_without_observations_is_no_data_not_zero() {
    let mut per_pair: Aggregator<GroupPair> = Aggregator::new();
    let failed = GroupPair::new("b", "c");
    let zero = GroupPair::new("a", "c");
    per_pair.register(failed.clone());
    per_pair.register(zero.clone());
    per_pair.accumulate(zero.clone(), 0.0).unwrap();

    let summaries = per_pair.finalize();
    assert_eq!(summaries[&failed], CellSummary::NoData);
    assert_eq!(summaries[&failed].count(), 0);
    assert_eq!(summaries[&zero].mean(), Some(0.0));
}

#[test]
fn no_data_serialises_with_an_explicit_state() {
    let json = serde_json::to_value(CellSummary::NoData).unwrap();
    assert_eq!(json, serde_json::json!({ "state": "no-data" }));
    let observed = serde_json::to_value(CellSummary::from_values(&[0.5])).unwrap();
    assert_eq!(observed["state"], "observed");
    assert!(observed["std_dev"].is_null());
}
