use std::collections::HashMap;

use super::*;
use crate::scene::object::square;

#[derive(Default)]
struct Ids(HashMap<ObjectKey, ObjectId>);

impl ResolveIds for Ids {
    fn resolve(&self, key: ObjectKey) -> ObjectRef {
        self.0
            .get(&key)
            .map_or(ObjectRef::Unknown, |id| ObjectRef::Known(*id))
    }

    fn is_required_key(&self, _key: ObjectKey) -> bool {
        false
    }
}

#[test]
fn vector_snapshot_has_style_and_point_hash() {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(2.0)));
    let snap = capture(g.get(sq).unwrap(), &g, &Ids::default(), true, &CaptureOpts::default());

    assert_eq!(snap.class_name, "Square");
    assert!(matches!(snap.get(field::POINTS), Some(Value::Hash(_))));
    let Some(Value::Map(style)) = snap.get(field::STYLE) else {
        panic!("style missing");
    };
    assert_eq!(style.get("stroke_width"), Some(&Value::Scalar(4.0)));
    assert!(snap.is_added());
    assert!(!snap.is_required());
}

#[test]
fn unregistered_children_resolve_to_sentinel() {
    let mut g = SceneGraph::new();
    let a = g.insert(SceneObject::vector("Square", square(1.0)));
    let b = g.insert(SceneObject::vector("Square", square(1.0)));
    let group = g.insert(SceneObject::group("VGroup", vec![a, b]));

    let mut ids = Ids::default();
    ids.0.insert(a, ObjectId(3));
    let snap = capture(g.get(group).unwrap(), &g, &ids, false, &CaptureOpts::default());

    assert_eq!(
        snap.get(field::SUBMOBJECTS),
        Some(&Value::Ids(vec![ObjectRef::Known(ObjectId(3)), ObjectRef::Unknown]))
    );
    let json = serde_json::to_value(&snap.fields[field::SUBMOBJECTS]).unwrap();
    assert_eq!(json["value"][1], UNKNOWN_MOBJECT);
}

#[test]
fn leaf_classes_omit_submobjects() {
    let mut g = SceneGraph::new();
    let glyph = g.insert(SceneObject::vector("VMobjectFromSVGPath", square(0.1)));
    let text = g.insert(SceneObject::group("Text", vec![glyph]));
    let snap = capture(g.get(text).unwrap(), &g, &Ids::default(), true, &CaptureOpts::default());
    assert!(snap.get(field::SUBMOBJECTS).is_none());
}

#[test]
fn tracker_and_image_write_their_own_fields() {
    let mut g = SceneGraph::new();
    let t = g.insert(SceneObject::tracker(2.5));
    let img = g.insert(SceneObject::image("/assets/logo.png", 2.0, 1.0));
    let opts = CaptureOpts::default();

    let ts = capture(g.get(t).unwrap(), &g, &Ids::default(), false, &opts);
    assert_eq!(ts.get(field::VALUE), Some(&Value::Scalar(2.5)));
    assert!(ts.get(field::STYLE).is_none());

    let is = capture(g.get(img).unwrap(), &g, &Ids::default(), false, &opts);
    let Some(Value::Map(image)) = is.get(field::IMAGE) else {
        panic!("image missing");
    };
    assert_eq!(image.get("width"), Some(&Value::Scalar(2.0)));
}

#[test]
fn point_hash_tracks_geometry() {
    let a = square(1.0);
    let mut b = a.clone();
    assert_eq!(point_hash(&a), point_hash(&b));
    b[0].x += 1e-9;
    assert_ne!(point_hash(&a), point_hash(&b));
}
