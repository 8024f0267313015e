use std::collections::BTreeSet;

use bindiv_core::{ComparisonPair, Similarity, VariantGroup};

fn groups() -> Vec<VariantGroup> {
    vec![
        VariantGroup::new(0, "gcc-7", "/builds/gcc-7/bin"),
        VariantGroup::new(1, "gcc-7-O1", "/builds/gcc-7-O1/bin"),
        VariantGroup::new(2, "gcc-9", "/builds/gcc-9/bin"),
    ]
}

#[test]
fn pair_orders_by_group_index() {
    let groups = groups();
    let pair = ComparisonPair::new(
        groups[2].artifact("ls.BinExport"),
        groups[0].artifact("ls.BinExport"),
    );
    assert_eq!(pair.primary.group_label, "gcc-7");
    assert_eq!(pair.secondary.group_label, "gcc-9");
    assert_eq!(pair.group_pair().primary, "gcc-7");
}

#[test]
fn pair_ids_disambiguate_groups_sharing_an_artifact() {
    let groups = groups();
    let mut ids = BTreeSet::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let pair = ComparisonPair::new(
                groups[i].artifact("ls.BinExport"),
                groups[j].artifact("ls.BinExport"),
            );
            let id = pair.id();
            assert!(id.starts_with(&format!("{}_ls_vs_{}_ls-", groups[i].label, groups[j].label)));
            assert!(ids.insert(id));
        }
    }
    assert_eq!(ids.len(), 3);
}

#[test]
fn underscore_labels_do_not_alias() {
    let a = VariantGroup::new(0, "a_b", "/x");
    let b = VariantGroup::new(1, "a", "/y");
    let z = VariantGroup::new(2, "z", "/z");
    let first = ComparisonPair::new(a.artifact("c.BinExport"), z.artifact("c.BinExport"));
    let second = ComparisonPair::new(b.artifact("b_c.BinExport"), z.artifact("b_c.BinExport"));
    assert_ne!(first.id(), second.id());
}

#[test]
fn pair_id_is_filesystem_safe() {
    let odd = VariantGroup::new(0, "clang 14/O2", "/x");
    let other = VariantGroup::new(1, "clang:15", "/y");
    let pair = ComparisonPair::new(odd.artifact("cp.BinExport"), other.artifact("cp.BinExport"));
    let id = pair.id();
    assert!(!id.contains('/'));
    assert!(!id.contains(' '));
    assert!(!id.contains(':'));
}

#[test]
fn similarity_scales_normalise_to_fraction() {
    let from_log = Similarity::from_percent(90.0).expect("percent");
    let from_db = Similarity::from_fraction(0.9).expect("fraction");
    assert!((from_log.value() - from_db.value()).abs() < 1e-12);
    assert!((from_db.as_percent() - 90.0).abs() < 1e-9);
}

#[test]
fn similarity_rejects_out_of_range_values() {
    assert!(Similarity::from_fraction(1.5).is_err());
    assert!(Similarity::from_percent(-3.0).is_err());
    assert!(Similarity::from_fraction(f64::NAN).is_err());
    let clamped = Similarity::from_fraction(1.0 + 1e-12).expect("tolerated");
    assert_eq!(clamped.value(), 1.0);
}
