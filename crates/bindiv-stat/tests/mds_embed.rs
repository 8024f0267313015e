use bindiv_stat::{embed, DistanceMatrix, EmbeddingOpts, EmbeddingOutcome, MissingPolicy};

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn partial_abc() -> DistanceMatrix {
    DistanceMatrix::new(
        labels(&["A", "B", "C"]),
        vec![
            vec![Some(0.0), Some(0.1), Some(0.2)],
            vec![Some(0.1), Some(0.0), None],
            vec![Some(0.2), None, Some(0.0)],
        ],
    )
    .unwrap()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[test]
fn exclude_policy_embeds_with_observed_distances_preserved() {
    let outcome = embed(&partial_abc(), &EmbeddingOpts::default());
    let embedding = outcome.embedding().expect("embedded");
    assert_eq!(embedding.excluded, 1);
    assert_eq!(embedding.imputed, 0);
    assert_eq!(embedding.points.len(), 3);
    assert!(embedding.points.iter().all(|point| point.coords.len() == 2));

    let a = &embedding.points[0].coords;
    let b = &embedding.points[1].coords;
    let c = &embedding.points[2].coords;
    assert!((distance(a, b) - 0.1).abs() < 1e-3);
    assert!((distance(a, c) - 0.2).abs() < 1e-3);
}

#[test]
fn refuse_policy_refuses_missing_cells() {
    let opts = EmbeddingOpts {
        missing: MissingPolicy::Refuse,
        ..EmbeddingOpts::default()
    };
    match embed(&partial_abc(), &opts) {
        EmbeddingOutcome::Refused { reason } => assert!(reason.contains("missing")),
        other => panic!("expected refusal, got {other:?}"),
    }
}

#[test]
fn max_distance_policy_records_the_imputation() {
    let opts = EmbeddingOpts {
        missing: MissingPolicy::MaxDistance,
        ..EmbeddingOpts::default()
    };
    let outcome = embed(&partial_abc(), &opts);
    let embedding = outcome.embedding().expect("embedded");
    assert_eq!(embedding.imputed, 1);
    let b = &embedding.points[1].coords;
    let c = &embedding.points[2].coords;
    assert!(distance(b, c) > 0.25);
}

#[test]
fn degenerate_and_empty_matrices_are_refused() {
    let zeros = DistanceMatrix::new(
        labels(&["A", "B"]),
        vec![vec![Some(0.0), Some(0.0)], vec![Some(0.0), Some(0.0)]],
    )
    .unwrap();
    assert!(matches!(
        embed(&zeros, &EmbeddingOpts::default()),
        EmbeddingOutcome::Refused { .. }
    ));

    let empty = DistanceMatrix::new(Vec::new(), Vec::new()).unwrap();
    match embed(&empty, &EmbeddingOpts::default()) {
        EmbeddingOutcome::Refused { reason } => assert!(reason.contains("insufficient data")),
        other => panic!("expected refusal, got {other:?}"),
    }
}

#[test]
fn euclidean_square_is_recovered_deterministically() {
    let side = 0.3;
    let diagonal = (2.0f64).sqrt() * side;
    let rows = vec![
        vec![Some(0.0), Some(side), Some(diagonal), Some(side)],
        vec![Some(side), Some(0.0), Some(side), Some(diagonal)],
        vec![Some(diagonal), Some(side), Some(0.0), Some(side)],
        vec![Some(side), Some(diagonal), Some(side), Some(0.0)],
    ];
    let matrix = DistanceMatrix::new(labels(&["p", "q", "r", "s"]), rows).unwrap();
    let first = embed(&matrix, &EmbeddingOpts::default());
    let second = embed(&matrix, &EmbeddingOpts::default());
    assert_eq!(first, second);

    let embedding = first.embedding().expect("embedded");
    assert!(embedding.normalized_stress < 1e-6);
    for point in &embedding.points {
        let leading = point.coords.iter().copied().find(|value| value.abs() > 1e-9);
        assert!(leading.is_some());
    }
    let p = &embedding.points[0].coords;
    let r = &embedding.points[2].coords;
    assert!((distance(p, r) - diagonal).abs() < 1e-6);
}
