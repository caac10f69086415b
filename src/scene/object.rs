use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::foundation::core::{ObjectKey, POSITION_TOLERANCE, Rgba, Vec3};

/// Paintable style of a vectorized object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Style {
    /// Interior color.
    pub fill_color: Rgba,
    /// Interior opacity in `[0, 1]`.
    pub fill_opacity: f64,
    /// Outline color.
    pub stroke_color: Rgba,
    /// Outline opacity in `[0, 1]`.
    pub stroke_opacity: f64,
    /// Outline width in scene units.
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill_color: Rgba::WHITE,
            fill_opacity: 0.0,
            stroke_color: Rgba::WHITE,
            stroke_opacity: 1.0,
            stroke_width: 4.0,
        }
    }
}

/// Vectorized path data.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorData {
    /// Path points in scene space.
    pub points: Vec<Vec3>,
    /// Paint style.
    pub style: Style,
}

/// Raster image placed in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    /// Image file on disk.
    pub path: PathBuf,
    /// Width in scene units.
    pub width: f64,
    /// Height in scene units.
    pub height: f64,
    /// Center in scene space.
    pub center: Vec3,
    /// Tint color.
    pub fill_color: Rgba,
    /// Opacity in `[0, 1]`.
    pub fill_opacity: f64,
}

/// Numeric value animated by the scene but never drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerData {
    /// Current value.
    pub value: f64,
}

/// Per-variant payload of a [`SceneObject`].
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
    /// Container with no geometry of its own.
    Group,
    /// Vectorized path.
    Vector(VectorData),
    /// Raster image.
    Image(ImageData),
    /// Value tracker.
    Tracker(TrackerData),
}

/// Construction argument as declared by the scene program.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    /// Reference to another scene object.
    Object(ObjectKey),
    /// Numeric argument.
    Scalar(f64),
    /// Text argument.
    Text(String),
    /// Boolean argument.
    Bool(bool),
}

/// One geometric transform applied to an object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformRecord {
    /// Translation.
    Shift {
        /// Offset.
        vector: Vec3,
    },
    /// Rotation about the object's center.
    Rotate {
        /// Angle in radians.
        angle: f64,
        /// Rotation axis.
        axis: Vec3,
    },
    /// Uniform scale about the object's center.
    Scale {
        /// Scale factor.
        factor: f64,
    },
}

impl TransformRecord {
    /// Kind-specific equality: vector closeness for shifts, exact angle and axis for rotations,
    /// numeric equality for scales. Records of different kinds never match.
    pub fn kind_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Shift { vector: a }, Self::Shift { vector: b }) => {
                a.approx_eq(*b, POSITION_TOLERANCE)
            }
            (
                Self::Rotate {
                    angle: a,
                    axis: axis_a,
                },
                Self::Rotate {
                    angle: b,
                    axis: axis_b,
                },
            ) => a == b && axis_a == axis_b,
            (Self::Scale { factor: a }, Self::Scale { factor: b }) => a == b,
            _ => false,
        }
    }
}

/// One object of the scene graph.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    /// Identity within the owning graph; assigned on insertion.
    pub key: ObjectKey,
    /// Authoring class name, e.g. `Square`.
    pub class_name: String,
    /// Variant payload.
    pub kind: ObjectKind,
    /// Declared construction arguments.
    pub args: Vec<ArgValue>,
    /// Declared keyword configuration.
    pub config: BTreeMap<String, serde_json::Value>,
    /// Direct children, in paint order.
    pub submobjects: Vec<ObjectKey>,
    /// Completed transforms, oldest first.
    pub transformations: Vec<TransformRecord>,
    /// Object this one was copied from, if any.
    pub original: Option<ObjectKey>,
}

impl SceneObject {
    fn with_kind(class_name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            key: ObjectKey(0),
            class_name: class_name.into(),
            kind,
            args: Vec::new(),
            config: BTreeMap::new(),
            submobjects: Vec::new(),
            transformations: Vec::new(),
            original: None,
        }
    }

    /// Container object holding `children`.
    pub fn group(class_name: impl Into<String>, children: Vec<ObjectKey>) -> Self {
        let mut obj = Self::with_kind(class_name, ObjectKind::Group);
        obj.submobjects = children;
        obj
    }

    /// Vectorized object with default style.
    pub fn vector(class_name: impl Into<String>, points: Vec<Vec3>) -> Self {
        Self::with_kind(
            class_name,
            ObjectKind::Vector(VectorData {
                points,
                style: Style::default(),
            }),
        )
    }

    /// Image object centered at the origin.
    pub fn image(path: impl Into<PathBuf>, width: f64, height: f64) -> Self {
        Self::with_kind(
            "ImageMobject",
            ObjectKind::Image(ImageData {
                path: path.into(),
                width,
                height,
                center: Vec3::ZERO,
                fill_color: Rgba::WHITE,
                fill_opacity: 1.0,
            }),
        )
    }

    /// Value tracker holding `value`.
    pub fn tracker(value: f64) -> Self {
        Self::with_kind("ValueTracker", ObjectKind::Tracker(TrackerData { value }))
    }

    /// Replace the declared construction arguments.
    pub fn with_args(mut self, args: Vec<ArgValue>) -> Self {
        self.args = args;
        self
    }

    /// Replace the declared configuration.
    pub fn with_config(mut self, config: BTreeMap<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }

    /// Replace the paint style; ignored for non-vector objects.
    pub fn with_style(mut self, style: Style) -> Self {
        if let ObjectKind::Vector(v) = &mut self.kind {
            v.style = style;
        }
        self
    }

    /// Return `true` for objects a renderer would draw.
    pub fn has_points(&self) -> bool {
        match &self.kind {
            ObjectKind::Vector(v) => !v.points.is_empty(),
            ObjectKind::Image(_) => true,
            ObjectKind::Group | ObjectKind::Tracker(_) => false,
        }
    }

    /// Return `true` for value trackers.
    pub fn is_tracker(&self) -> bool {
        matches!(self.kind, ObjectKind::Tracker(_))
    }

    /// Points contributing to this object's own bounding box.
    pub fn bounding_points(&self) -> Vec<Vec3> {
        match &self.kind {
            ObjectKind::Vector(v) => v.points.clone(),
            ObjectKind::Image(img) => {
                let half = Vec3::new(img.width / 2.0, img.height / 2.0, 0.0);
                vec![img.center - half, img.center + half]
            }
            ObjectKind::Group | ObjectKind::Tracker(_) => Vec::new(),
        }
    }

    /// Apply `f` to every point this object owns (path points, or the image center).
    pub fn map_points(&mut self, f: impl Fn(Vec3) -> Vec3) {
        match &mut self.kind {
            ObjectKind::Vector(v) => {
                for p in &mut v.points {
                    *p = f(*p);
                }
            }
            ObjectKind::Image(img) => img.center = f(img.center),
            ObjectKind::Group | ObjectKind::Tracker(_) => {}
        }
    }

    /// Scale this object's own extent about `about`.
    pub fn scale_about(&mut self, factor: f64, about: Vec3) {
        if let ObjectKind::Image(img) = &mut self.kind {
            img.width *= factor;
            img.height *= factor;
        }
        self.map_points(|p| about + (p - about) * factor);
    }

    /// Fill and stroke opacity, for paintable objects.
    pub fn opacities(&self) -> Option<(f64, f64)> {
        match &self.kind {
            ObjectKind::Vector(v) => Some((v.style.fill_opacity, v.style.stroke_opacity)),
            ObjectKind::Image(img) => Some((img.fill_opacity, img.fill_opacity)),
            ObjectKind::Group | ObjectKind::Tracker(_) => None,
        }
    }

    /// Overwrite fill and stroke opacity; no-op for unpaintable objects.
    pub fn set_opacities(&mut self, fill: f64, stroke: f64) {
        match &mut self.kind {
            ObjectKind::Vector(v) => {
                v.style.fill_opacity = fill;
                v.style.stroke_opacity = stroke;
            }
            ObjectKind::Image(img) => img.fill_opacity = fill,
            ObjectKind::Group | ObjectKind::Tracker(_) => {}
        }
    }

    /// Paint style, for vectorized objects.
    pub fn style(&self) -> Option<&Style> {
        match &self.kind {
            ObjectKind::Vector(v) => Some(&v.style),
            _ => None,
        }
    }

    /// Mutable paint style, for vectorized objects.
    pub fn style_mut(&mut self) -> Option<&mut Style> {
        match &mut self.kind {
            ObjectKind::Vector(v) => Some(&mut v.style),
            _ => None,
        }
    }
}

/// Closed regular polygon with `n` vertices on a circle of `radius`, first vertex on +x.
pub fn regular_polygon(n: usize, radius: f64) -> Vec<Vec3> {
    let n = n.max(3);
    let mut pts: Vec<Vec3> = (0..n)
        .map(|i| {
            let theta = std::f64::consts::TAU * (i as f64) / (n as f64);
            Vec3::new(radius * theta.cos(), radius * theta.sin(), 0.0)
        })
        .collect();
    pts.push(pts[0]);
    pts
}

/// Closed axis-aligned square centered at the origin.
pub fn square(side: f64) -> Vec<Vec3> {
    let h = side / 2.0;
    vec![
        Vec3::new(h, h, 0.0),
        Vec3::new(-h, h, 0.0),
        Vec3::new(-h, -h, 0.0),
        Vec3::new(h, -h, 0.0),
        Vec3::new(h, h, 0.0),
    ]
}
