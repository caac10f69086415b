use super::*;
use crate::foundation::core::{Rgba, Vec3};
use crate::scene::object::TransformRecord;
use crate::sync::snapshot::ObjectRef;

fn snap(added: bool) -> Snapshot {
    let mut s = Snapshot::new("Square");
    s.insert(field::ADDED, Value::Bool(added));
    s.insert(field::REQUIRED, Value::Bool(false));
    s.insert(field::POSITION, Value::Vector(Vec3::ZERO));
    s
}

fn style(fill: Rgba, width: f64) -> Value {
    let mut m = BTreeMap::new();
    m.insert("fill_color".to_owned(), Value::Color(fill));
    m.insert("stroke_width".to_owned(), Value::Scalar(width));
    Value::Map(m)
}

#[test]
fn identical_snapshots_give_empty_diff() {
    let a = snap(true);
    assert!(diff_snapshots(&a, &a.clone()).is_empty());
}

#[test]
fn presence_changes_are_symmetric() {
    assert_eq!(diff_snapshots(&snap(false), &snap(true)), Diff::Added);
    assert_eq!(diff_snapshots(&snap(true), &snap(false)), Diff::Removed);
    assert_eq!(diff_presence(None, Some(&snap(true))), Diff::Added);
    assert_eq!(diff_presence(Some(&snap(true)), None), Diff::Removed);
    assert!(diff_presence(None, None).is_empty());
}

#[test]
fn submobjects_compare_as_sets() {
    let ids = |v: &[u32]| {
        Value::Ids(
            v.iter()
                .map(|&i| ObjectRef::Known(ObjectId(i)))
                .collect(),
        )
    };
    let mut a = snap(true);
    let mut b = snap(true);
    a.insert(field::SUBMOBJECTS, ids(&[1, 2]));
    b.insert(field::SUBMOBJECTS, ids(&[2, 1]));
    assert!(diff_snapshots(&a, &b).is_empty());

    b.insert(field::SUBMOBJECTS, ids(&[2, 3]));
    let d = diff_snapshots(&a, &b);
    let delta = &d.fields().unwrap()[field::SUBMOBJECTS];
    assert_eq!(delta.old, ids(&[1, 2]));
    assert_eq!(delta.new, ids(&[2, 3]));
}

#[test]
fn position_uses_tolerance() {
    let a = snap(true);
    let mut b = snap(true);
    b.insert(field::POSITION, Value::Vector(Vec3::new(1e-9, 0.0, 0.0)));
    assert!(diff_snapshots(&a, &b).is_empty());

    b.insert(field::POSITION, Value::Vector(Vec3::new(1e-3, 0.0, 0.0)));
    assert!(!diff_snapshots(&a, &b).is_empty());
}

#[test]
fn transformations_compare_pairwise_by_kind() {
    let mut a = snap(true);
    let mut b = snap(true);
    a.insert(
        field::TRANSFORMATIONS,
        Value::Transforms(vec![TransformRecord::Shift {
            vector: Vec3::new(1.0, 0.0, 0.0),
        }]),
    );
    b.insert(
        field::TRANSFORMATIONS,
        Value::Transforms(vec![TransformRecord::Shift {
            vector: Vec3::new(1.0 + 1e-9, 0.0, 0.0),
        }]),
    );
    assert!(diff_snapshots(&a, &b).is_empty());

    b.insert(
        field::TRANSFORMATIONS,
        Value::Transforms(vec![TransformRecord::Scale { factor: 1.0 }]),
    );
    assert!(!diff_snapshots(&a, &b).is_empty());
}

#[test]
fn style_reports_only_changed_subfields() {
    let mut a = snap(true);
    let mut b = snap(true);
    a.insert(field::STYLE, style(Rgba::WHITE, 4.0));
    b.insert(field::STYLE, style(Rgba::WHITE, 2.0));

    let d = diff_snapshots(&a, &b);
    let delta = &d.fields().unwrap()[field::STYLE];
    let Value::Map(new) = &delta.new else {
        panic!("expected map");
    };
    assert_eq!(new.len(), 1);
    assert_eq!(new.get("stroke_width"), Some(&Value::Scalar(2.0)));
}

#[test]
fn colors_compare_exactly() {
    let mut a = snap(true);
    let mut b = snap(true);
    a.insert(field::STYLE, style(Rgba::rgba(0.5, 0.5, 0.5, 1.0), 4.0));
    b.insert(field::STYLE, style(Rgba::rgba(0.5 + 1e-6, 0.5, 0.5, 1.0), 4.0));
    assert!(!diff_snapshots(&a, &b).is_empty());
}

#[test]
fn required_flag_is_never_diffed() {
    let a = snap(true);
    let mut b = snap(true);
    b.set_required(true);
    assert!(diff_snapshots(&a, &b).is_empty());
}

#[test]
fn missing_and_new_fields_report_none_on_the_other_side() {
    let mut a = snap(true);
    let mut b = snap(true);
    a.insert(field::VALUE, Value::Scalar(1.0));
    b.insert(field::POINTS, Value::Hash(7));

    let d = diff_snapshots(&a, &b);
    let fields = d.fields().unwrap();
    assert_eq!(fields[field::VALUE].new, Value::None);
    assert_eq!(fields[field::POINTS].old, Value::None);
}

#[test]
fn id_set_diff_preserves_order() {
    let old = [ObjectId(1), ObjectId(2), ObjectId(3)];
    let new = [ObjectId(4), ObjectId(2), ObjectId(0)];
    let d = diff_id_sets(&old, &new);
    assert_eq!(d.added, vec![ObjectId(4), ObjectId(0)]);
    assert_eq!(d.removed, vec![ObjectId(1), ObjectId(3)]);
}
