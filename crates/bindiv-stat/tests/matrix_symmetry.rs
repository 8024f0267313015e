use std::collections::BTreeMap;

use bindiv_core::GroupPair;
use bindiv_stat::{CellSummary, DistanceMatrix, SimilarityMatrix};
use proptest::prelude::*;

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|idx| format!("g{idx}")).collect()
}

proptest! {
    #[test]
    fn distance_is_symmetric_with_zero_diagonal(
        n in 2usize..7,
        raw in prop::collection::vec(prop::option::of(0.0f64..=1.0), 21),
    ) {
        let labels = labels(n);
        let mut cells = BTreeMap::new();
        let mut slot = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let summary = match raw[slot] {
                    Some(value) => CellSummary::from_values(&[value]),
                    None => CellSummary::NoData,
                };
                cells.insert(GroupPair::new(&labels[i], &labels[j]), summary);
                slot += 1;
            }
        }
        let distance = SimilarityMatrix::from_cells(labels, &cells).unwrap().to_distance();
        prop_assert!(distance.is_symmetric());
        for i in 0..n {
            prop_assert_eq!(distance.get(i, i), Some(0.0));
            for j in 0..n {
                if let Some(value) = distance.get(i, j) {
                    prop_assert!((0.0..=1.0).contains(&value));
                }
            }
        }
    }
}

#[test]
fn missing_cell_stays_missing_through_the_distance_transform() {
    let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let mut cells = BTreeMap::new();
    cells.insert(GroupPair::new("A", "B"), CellSummary::from_values(&[0.90]));
    cells.insert(GroupPair::new("A", "C"), CellSummary::from_values(&[0.80]));
    cells.insert(GroupPair::new("B", "C"), CellSummary::NoData);

    let similarity = SimilarityMatrix::from_cells(labels, &cells).unwrap();
    assert_eq!(similarity.mean(1, 2), None);
    assert_eq!(similarity.mean(0, 0), Some(1.0));
    assert_eq!(similarity.missing_pairs(), vec![GroupPair::new("B", "C")]);

    let distance = similarity.to_distance();
    assert!((distance.get(0, 1).unwrap() - 0.10).abs() < 1e-12);
    assert!((distance.get(0, 2).unwrap() - 0.20).abs() < 1e-12);
    assert_eq!(distance.get(1, 2), None);
    assert_eq!(distance.get(2, 1), None);
    assert_eq!(distance.missing_count(), 1);
}

#[test]
fn unknown_labels_and_tiny_matrices_are_rejected() {
    let mut cells = BTreeMap::new();
    cells.insert(GroupPair::new("A", "Z"), CellSummary::from_values(&[0.5]));
    let err = SimilarityMatrix::from_cells(vec!["A".into(), "B".into()], &cells).unwrap_err();
    assert_eq!(err.info().code, "bindiv_stat.unknown_label");

    let err = SimilarityMatrix::from_cells(vec!["A".into()], &BTreeMap::new()).unwrap_err();
    assert_eq!(err.info().code, "bindiv_stat.matrix_size");

    let err = SimilarityMatrix::from_cells(vec!["A".into(), "A".into()], &BTreeMap::new())
        .unwrap_err();
    assert_eq!(err.info().code, "bindiv_stat.duplicate_label");
}

#[test]
fn distance_matrix_json_keeps_the_missing_sentinel() {
    let matrix = DistanceMatrix::new(
        vec!["A".into(), "B".into(), "C".into()],
        vec![
            vec![Some(0.0), Some(0.1), Some(0.2)],
            vec![Some(0.1), Some(0.0), None],
            vec![Some(0.2), None, Some(0.0)],
        ],
    )
    .unwrap();
    let json = serde_json::to_value(&matrix).unwrap();
    assert!(json["rows"][1][2].is_null());
    let restored: DistanceMatrix = serde_json::from_value(json).unwrap();
    assert_eq!(restored, matrix);

    let bad = serde_json::json!({
        "labels": ["A", "B"],
        "rows": [[0.5, 0.1], [0.1, 0.0]]
    });
    assert!(serde_json::from_value::<DistanceMatrix>(bad).is_err());
}

#[test]
fn distance_matrix_rejects_repeated_labels() {
    let err = DistanceMatrix::new(
        vec!["A".into(), "B".into(), "A".into()],
        vec![
            vec![Some(0.0), Some(0.1), Some(0.2)],
            vec![Some(0.1), Some(0.0), Some(0.3)],
            vec![Some(0.2), Some(0.3), Some(0.0)],
        ],
    )
    .unwrap_err();
    assert_eq!(err.info().code, "bindiv_stat.duplicate_label");
    assert_eq!(err.info().context.get("label").map(String::as_str), Some("A"));

    let edited = serde_json::json!({
        "labels": ["A", "A"],
        "rows": [[0.0, 0.4], [0.4, 0.0]]
    });
    assert!(serde_json::from_value::<DistanceMatrix>(edited).is_err());
}
