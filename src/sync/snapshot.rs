//! Structural snapshots of scene objects.
//!
//! A [`Snapshot`] is a flat record of comparable fields captured from one [`SceneObject`]. Ids of
//! referenced objects are resolved through the identity registry at capture time; anything the
//! registry does not know is recorded as [`ObjectRef::Unknown`].

use std::collections::{BTreeMap, BTreeSet};

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::{ObjectId, ObjectKey, Rgba, Vec3};
use crate::scene::graph::SceneGraph;
use crate::scene::object::{
    ArgValue, ImageData, ObjectKind, SceneObject, Style, TrackerData, TransformRecord, VectorData,
};

/// Wire spelling of a reference to an object the registry never saw.
pub const UNKNOWN_MOBJECT: &str = "UNKNOWN_MOBJECT";

const XXH3_SEED: u64 = 0x5ce4_e5a1_d1ff_0b17;

/// Field names used in snapshots.
pub mod field {
    /// Declared construction arguments.
    pub const ARGS: &str = "args";
    /// Declared keyword configuration.
    pub const CONFIG: &str = "config";
    /// Direct children.
    pub const SUBMOBJECTS: &str = "submobjects";
    /// Bounding-box center of the family.
    pub const POSITION: &str = "position";
    /// Paint style.
    pub const STYLE: &str = "style";
    /// Hash of the path points.
    pub const POINTS: &str = "points";
    /// Image source and extent.
    pub const IMAGE: &str = "image";
    /// Tracked value.
    pub const VALUE: &str = "value";
    /// Completed transforms.
    pub const TRANSFORMATIONS: &str = "transformations";
    /// Whether the object is part of the rendered scene.
    pub const ADDED: &str = "added";
    /// Whether the object is reachable from the root and therefore reported.
    pub const REQUIRED: &str = "required";
}

/// Reference to a registered object, or the unknown sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectRef {
    /// Registered object.
    Known(ObjectId),
    /// Object absent from the registry when the reference was captured.
    Unknown,
}

impl ObjectRef {
    /// The id, if known.
    pub fn id(self) -> Option<ObjectId> {
        match self {
            Self::Known(id) => Some(id),
            Self::Unknown => None,
        }
    }
}

impl serde::Serialize for ObjectRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Known(id) => serializer.serialize_u32(id.0),
            Self::Unknown => serializer.serialize_str(UNKNOWN_MOBJECT),
        }
    }
}

/// Captured construction argument.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ArgRef {
    /// Object argument.
    Object(ObjectRef),
    /// Numeric argument.
    Scalar(f64),
    /// Text argument.
    Text(String),
    /// Boolean argument.
    Bool(bool),
}

/// One snapshot field value.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Field absent on one side of a diff.
    None,
    /// Boolean flag.
    Bool(bool),
    /// Number.
    Scalar(f64),
    /// Text.
    Text(String),
    /// Color.
    Color(Rgba),
    /// Point or direction.
    Vector(Vec3),
    /// Ordered list of object references.
    Ids(Vec<ObjectRef>),
    /// Construction arguments.
    Args(Vec<ArgRef>),
    /// Nested record compared sub-field by sub-field.
    Map(BTreeMap<String, Value>),
    /// Raw configuration value.
    Json(serde_json::Value),
    /// Completed transforms.
    Transforms(Vec<TransformRecord>),
    /// Content hash.
    Hash(u64),
}

/// Flat record of comparable fields captured from one object.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Snapshot {
    /// Authoring class name.
    pub class_name: String,
    /// Field name to value.
    pub fields: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Empty snapshot for `class_name`.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field.
    pub fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_owned(), value);
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Bool(true)))
    }

    /// Whether the object was part of the rendered scene at capture time.
    pub fn is_added(&self) -> bool {
        self.flag(field::ADDED)
    }

    /// Whether the object was required at capture time.
    pub fn is_required(&self) -> bool {
        self.flag(field::REQUIRED)
    }

    /// Overwrite the `required` flag.
    pub fn set_required(&mut self, required: bool) {
        self.insert(field::REQUIRED, Value::Bool(required));
    }
}

/// Source of registry ids for captured references.
pub trait ResolveIds {
    /// Resolve `key` to its registered id, or the unknown sentinel.
    fn resolve(&self, key: ObjectKey) -> ObjectRef;

    /// Whether `key` is registered and required.
    fn is_required_key(&self, key: ObjectKey) -> bool;
}

/// Capture configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureOpts {
    /// Classes whose children are not independently tracked; their snapshots omit submobjects.
    pub leaf_classes: BTreeSet<String>,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        let leaf_classes = ["Text", "Tex", "MathTex", "SingleStringMathTex", "Paragraph"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self { leaf_classes }
    }
}

/// Everything a variant needs to write its fields.
pub struct CaptureCx<'a> {
    /// Graph the object lives in.
    pub graph: &'a SceneGraph,
    /// Id source.
    pub ids: &'a dyn ResolveIds,
    /// Capture options.
    pub opts: &'a CaptureOpts,
}

/// Capability of writing structural fields into a snapshot.
pub trait Serializable {
    /// Write this value's fields into `out`.
    fn write_fields(&self, cx: &CaptureCx<'_>, out: &mut Snapshot);
}

impl Serializable for Style {
    fn write_fields(&self, _cx: &CaptureCx<'_>, out: &mut Snapshot) {
        let mut m = BTreeMap::new();
        m.insert("fill_color".to_owned(), Value::Color(self.fill_color));
        m.insert("fill_opacity".to_owned(), Value::Scalar(self.fill_opacity));
        m.insert("stroke_color".to_owned(), Value::Color(self.stroke_color));
        m.insert("stroke_opacity".to_owned(), Value::Scalar(self.stroke_opacity));
        m.insert("stroke_width".to_owned(), Value::Scalar(self.stroke_width));
        out.insert(field::STYLE, Value::Map(m));
    }
}

impl Serializable for VectorData {
    fn write_fields(&self, cx: &CaptureCx<'_>, out: &mut Snapshot) {
        out.insert(field::POINTS, Value::Hash(point_hash(&self.points)));
        self.style.write_fields(cx, out);
    }
}

impl Serializable for ImageData {
    fn write_fields(&self, _cx: &CaptureCx<'_>, out: &mut Snapshot) {
        let mut style = BTreeMap::new();
        style.insert("fill_color".to_owned(), Value::Color(self.fill_color));
        style.insert("fill_opacity".to_owned(), Value::Scalar(self.fill_opacity));
        out.insert(field::STYLE, Value::Map(style));

        let mut image = BTreeMap::new();
        image.insert(
            "path".to_owned(),
            Value::Text(self.path.to_string_lossy().into_owned()),
        );
        image.insert("width".to_owned(), Value::Scalar(self.width));
        image.insert("height".to_owned(), Value::Scalar(self.height));
        out.insert(field::IMAGE, Value::Map(image));
    }
}

impl Serializable for TrackerData {
    fn write_fields(&self, _cx: &CaptureCx<'_>, out: &mut Snapshot) {
        out.insert(field::VALUE, Value::Scalar(self.value));
    }
}

impl Serializable for SceneObject {
    fn write_fields(&self, cx: &CaptureCx<'_>, out: &mut Snapshot) {
        let args = self
            .args
            .iter()
            .map(|a| match a {
                ArgValue::Object(key) => ArgRef::Object(cx.ids.resolve(*key)),
                ArgValue::Scalar(v) => ArgRef::Scalar(*v),
                ArgValue::Text(s) => ArgRef::Text(s.clone()),
                ArgValue::Bool(b) => ArgRef::Bool(*b),
            })
            .collect();
        out.insert(field::ARGS, Value::Args(args));

        let config = self
            .config
            .iter()
            .map(|(k, v)| (k.clone(), Value::Json(v.clone())))
            .collect();
        out.insert(field::CONFIG, Value::Map(config));

        if !cx.opts.leaf_classes.contains(&self.class_name) {
            let ids = self
                .submobjects
                .iter()
                .map(|k| cx.ids.resolve(*k))
                .collect();
            out.insert(field::SUBMOBJECTS, Value::Ids(ids));
        }

        out.insert(field::POSITION, Value::Vector(cx.graph.center(self.key)));
        out.insert(
            field::TRANSFORMATIONS,
            Value::Transforms(self.transformations.clone()),
        );

        match &self.kind {
            ObjectKind::Group => {}
            ObjectKind::Vector(v) => v.write_fields(cx, out),
            ObjectKind::Image(img) => img.write_fields(cx, out),
            ObjectKind::Tracker(t) => t.write_fields(cx, out),
        }
    }
}

/// Capture `object` as it currently is in `graph`.
///
/// `added` records whether the object is part of the rendered scene. Side-effect free.
pub fn capture(
    object: &SceneObject,
    graph: &SceneGraph,
    ids: &dyn ResolveIds,
    added: bool,
    opts: &CaptureOpts,
) -> Snapshot {
    let cx = CaptureCx { graph, ids, opts };
    let mut out = Snapshot::new(object.class_name.clone());
    object.write_fields(&cx, &mut out);
    out.insert(field::ADDED, Value::Bool(added));
    out.set_required(ids.is_required_key(object.key));
    out
}

/// Stable hash of a point list, used to detect geometry changes cheaply.
pub fn point_hash(points: &[Vec3]) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(&(points.len() as u64).to_le_bytes());
    for p in points {
        for c in p.to_array() {
            h.update(&c.to_bits().to_le_bytes());
        }
    }
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/sync/snapshot.rs"]
mod tests;
