use super::*;
use crate::foundation::core::Vec3;
use crate::scene::object::square;

fn opts() -> CaptureOpts {
    CaptureOpts::default()
}

#[test]
fn ids_are_stable_across_repeated_registration() {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(1.0)));
    let mut reg = IdentityRegistry::new();

    let first = reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());
    g.shift(sq, Vec3::new(1.0, 0.0, 0.0));
    let second = reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());

    assert_eq!(first, second);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.name_of(first).unwrap(), "Square1");
}

#[test]
fn reregistration_refreshes_baseline() {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(1.0)));
    let mut reg = IdentityRegistry::new();
    let id = reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());
    let before = reg.snapshot_of(id).unwrap().clone();

    g.shift(sq, Vec3::new(1.0, 0.0, 0.0));
    reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());
    assert_ne!(reg.snapshot_of(id).unwrap(), &before);
}

#[test]
fn names_count_per_class() {
    let mut g = SceneGraph::new();
    let a = g.insert(SceneObject::vector("Square", square(1.0)));
    let b = g.insert(SceneObject::vector("Circle", square(1.0)));
    let c = g.insert(SceneObject::vector("Square", square(1.0)));
    let mut reg = IdentityRegistry::new();
    let names: Vec<String> = [a, b, c]
        .into_iter()
        .map(|k| {
            let id = reg.register(g.get(k).unwrap(), &g, "c", true, &opts());
            reg.name_of(id).unwrap().to_owned()
        })
        .collect();
    assert_eq!(names, vec!["Square1", "Circle1", "Square2"]);
}

#[test]
fn copies_are_named_after_their_original() {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(1.0)));
    let mut reg = IdentityRegistry::new();
    reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());

    let c1 = g.duplicate(sq).unwrap();
    let c2 = g.duplicate(sq).unwrap();
    let c3 = g.duplicate(sq).unwrap();
    let id1 = reg.register(g.get(c1).unwrap(), &g, "c", true, &opts());
    let id2 = reg.register(g.get(c2).unwrap(), &g, "c", true, &opts());
    let id3 = reg.register(g.get(c3).unwrap(), &g, "ghost", true, &opts());

    assert_eq!(reg.name_of(id1).unwrap(), "Square1#c1");
    assert_eq!(reg.name_of(id2).unwrap(), "Square1#c2");
    assert_eq!(reg.name_of(id3).unwrap(), "Square1#ghost1");
}

#[test]
fn register_family_resolves_children_in_parent_snapshot() {
    let mut g = SceneGraph::new();
    let a = g.insert(SceneObject::vector("Square", square(1.0)));
    let group = g.insert(SceneObject::group("VGroup", vec![a]));
    let mut reg = IdentityRegistry::new();

    let gid = reg.register_family(group, &g, "c", false, &opts()).unwrap();
    let aid = reg.id_of(a).unwrap();
    assert_eq!(
        reg.snapshot_of(gid).unwrap().get(crate::sync::snapshot::field::SUBMOBJECTS),
        Some(&crate::sync::snapshot::Value::Ids(vec![ObjectRef::Known(aid)]))
    );
}

#[test]
fn required_is_monotonic_and_unknown_ids_error() {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(1.0)));
    let mut reg = IdentityRegistry::new();
    let id = reg.register(g.get(sq).unwrap(), &g, "c", true, &opts());

    assert!(!reg.is_required(id));
    assert!(reg.mark_required(id).unwrap());
    assert!(!reg.mark_required(id).unwrap());
    assert!(reg.is_required(id));
    assert!(reg.is_required_key(sq));

    assert!(matches!(
        reg.snapshot_of(ObjectId(42)),
        Err(SyncError::NotFound(ObjectId(42)))
    ));
    assert_eq!(reg.resolve(ObjectKey(999)), ObjectRef::Unknown);
}
