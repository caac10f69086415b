use super::*;
use crate::scene::object::square;

fn two_squares_in_group() -> (SceneGraph, ObjectKey, ObjectKey, ObjectKey) {
    let mut g = SceneGraph::new();
    let a = g.insert(SceneObject::vector("Square", square(2.0)));
    let b = g.insert(SceneObject::vector("Square", square(2.0)));
    g.shift(b, Vec3::new(4.0, 0.0, 0.0));
    let group = g.insert(SceneObject::group("VGroup", vec![a, b]));
    (g, a, b, group)
}

#[test]
fn family_is_preorder_and_deduplicated() {
    let (mut g, a, b, group) = two_squares_in_group();
    // A diamond: `a` listed twice must appear once.
    g.get_mut(group).unwrap().submobjects.push(a);
    assert_eq!(g.family(group), vec![group, a, b]);
}

#[test]
fn family_survives_cycles() {
    let (mut g, a, _, group) = two_squares_in_group();
    g.get_mut(a).unwrap().submobjects.push(group);
    let fam = g.family(group);
    assert_eq!(fam.len(), 3);
}

#[test]
fn center_spans_the_whole_family() {
    let (g, _, _, group) = two_squares_in_group();
    assert!(g.center(group).approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-12));
}

#[test]
fn clone_is_copy_on_write() {
    let (g, a, _, _) = two_squares_in_group();
    let mut copy = g.clone();
    assert!(copy.shares_storage_with(&g));

    copy.shift(a, Vec3::new(0.0, 1.0, 0.0));
    assert!(!copy.shares_storage_with(&g));
    assert!(g.center(a).approx_eq(Vec3::ZERO, 1e-12));
    assert!(copy.center(a).approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-12));
}

#[test]
fn duplicate_copies_family_and_records_originals() {
    let (mut g, a, _, group) = two_squares_in_group();
    let before = g.len();
    let copy = g.duplicate(group).unwrap();
    assert_eq!(g.len(), before + 3);

    let copied = g.get(copy).unwrap();
    assert_eq!(copied.original, Some(group));
    let first_child = copied.submobjects[0];
    assert_ne!(first_child, a);
    assert_eq!(g.get(first_child).unwrap().original, Some(a));
}

#[test]
fn add_root_moves_existing_entry_to_top() {
    let (mut g, a, b, _) = two_squares_in_group();
    g.add_root(a);
    g.add_root(b);
    g.add_root(a);
    assert_eq!(g.roots(), &[b, a]);
    g.remove_root(b);
    assert_eq!(g.roots(), &[a]);
}
