//! JSON scene scripts.
//!
//! A script declares objects up front and then lists the steps of the scene program:
//!
//! ```json
//! {
//!   "name": "Intro",
//!   "background_color": "#101820",
//!   "objects": [
//!     { "id": "sq", "shape": { "type": "square", "side": 2.0 } },
//!     { "id": "dot", "shape": { "type": "circle", "radius": 0.1 }, "at": [2, 0] },
//!     { "id": "pair", "class": "VGroup", "children": ["sq", "dot"] }
//!   ],
//!   "steps": [
//!     { "op": "add", "target": "pair" },
//!     { "op": "play", "animations": [{ "kind": "shift", "target": "sq", "vector": [1, 0] }] },
//!     { "op": "wait", "seconds": 1.0 }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::core::{ObjectKey, Rgba, Vec3};
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::animation::{Animation, AnimationKind};
use crate::scene::ease::RateFunc;
use crate::scene::object::{ArgValue, SceneObject, Style, regular_polygon, square};
use crate::scene::program::{RecordedScene, SceneBuilder, SceneOpts, SceneSource};

const CIRCLE_SEGMENTS: usize = 64;

/// Parsed scene script.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneScript {
    /// Scene name.
    pub name: String,
    /// Background color.
    #[serde(default)]
    pub background_color: Option<Rgba>,
    /// Declared objects, in creation order.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    /// Program steps.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// Geometry of a vectorized object.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSpec {
    /// Axis-aligned square.
    Square {
        /// Side length.
        side: f64,
    },
    /// Circle approximated by a polygon.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Regular polygon.
    Polygon {
        /// Vertex count.
        n: usize,
        /// Circumradius.
        radius: f64,
    },
    /// Explicit path.
    Points {
        /// Path points.
        points: Vec<Vec3>,
    },
}

impl ShapeSpec {
    fn default_class(&self) -> &'static str {
        match self {
            Self::Square { .. } => "Square",
            Self::Circle { .. } => "Circle",
            Self::Polygon { .. } => "RegularPolygon",
            Self::Points { .. } => "VMobject",
        }
    }

    fn points(&self) -> Vec<Vec3> {
        match self {
            Self::Square { side } => square(*side),
            Self::Circle { radius } => regular_polygon(CIRCLE_SEGMENTS, *radius),
            Self::Polygon { n, radius } => regular_polygon(*n, *radius),
            Self::Points { points } => points.clone(),
        }
    }
}

/// Image object declaration.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ImageSpec {
    /// Image file; relative paths resolve against the script's directory.
    pub path: PathBuf,
    /// Width in scene units.
    pub width: f64,
    /// Height in scene units.
    pub height: f64,
}

/// Construction argument.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    /// Reference to a declared object.
    Ref {
        /// Declared id.
        #[serde(rename = "ref")]
        id: String,
    },
    /// Number.
    Scalar(f64),
    /// Flag.
    Bool(bool),
    /// Text.
    Text(String),
}

/// One declared object.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    /// Script-local id.
    pub id: String,
    /// Class name; defaults from the declared kind.
    #[serde(default)]
    pub class: Option<String>,
    /// Vector geometry.
    #[serde(default)]
    pub shape: Option<ShapeSpec>,
    /// Image.
    #[serde(default)]
    pub image: Option<ImageSpec>,
    /// Value tracker initial value.
    #[serde(default)]
    pub tracker: Option<f64>,
    /// Children, for groups.
    #[serde(default)]
    pub children: Vec<String>,
    /// Paint style for vector shapes.
    #[serde(default)]
    pub style: Option<Style>,
    /// Initial position of the object's center.
    #[serde(default)]
    pub at: Option<Vec3>,
    /// Construction arguments.
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Keyword configuration.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

/// Animation effect.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationSpecKind {
    /// Translate.
    Shift {
        /// Target id.
        target: String,
        /// Offset.
        vector: Vec3,
    },
    /// Move the center to a point.
    MoveTo {
        /// Target id.
        target: String,
        /// Destination.
        point: Vec3,
    },
    /// Rotate about the center.
    Rotate {
        /// Target id.
        target: String,
        /// Angle in radians.
        angle: f64,
        /// Axis; defaults to out of the screen.
        #[serde(default = "default_axis")]
        axis: Vec3,
    },
    /// Scale about the center.
    Scale {
        /// Target id.
        target: String,
        /// Factor.
        factor: f64,
    },
    /// Fade in, attaching the target.
    FadeIn {
        /// Target id.
        target: String,
    },
    /// Fade out, detaching the target.
    FadeOut {
        /// Target id.
        target: String,
    },
    /// Recolor.
    SetColor {
        /// Target id.
        target: String,
        /// Final color.
        color: Rgba,
    },
    /// Do nothing.
    Wait,
}

fn default_axis() -> Vec3 {
    Vec3::OUT
}

/// Animation with timing.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct AnimationSpec {
    /// Effect.
    #[serde(flatten)]
    pub kind: AnimationSpecKind,
    /// Duration; defaults to one second.
    #[serde(default)]
    pub run_time: Option<f64>,
    /// Rate function; defaults to smooth.
    #[serde(default)]
    pub rate_func: Option<RateFunc>,
}

/// One program step.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepSpec {
    /// Attach an object.
    Add {
        /// Object id.
        target: String,
    },
    /// Detach an object.
    Remove {
        /// Object id.
        target: String,
    },
    /// Play animations together as one segment.
    Play {
        /// Animations.
        animations: Vec<AnimationSpec>,
    },
    /// Hold still.
    Wait {
        /// Seconds.
        seconds: f64,
    },
    /// Deep-copy an object under a new id.
    Copy {
        /// Copied object.
        source: String,
        /// Id of the copy.
        #[serde(rename = "as")]
        id: String,
    },
    /// Translate immediately.
    Shift {
        /// Object id.
        target: String,
        /// Offset.
        vector: Vec3,
    },
    /// Rotate immediately.
    Rotate {
        /// Object id.
        target: String,
        /// Angle in radians.
        angle: f64,
        /// Axis.
        #[serde(default = "default_axis")]
        axis: Vec3,
    },
    /// Scale immediately.
    Scale {
        /// Object id.
        target: String,
        /// Factor.
        factor: f64,
    },
    /// Append a child to a parent's submobjects.
    Attach {
        /// Parent id.
        parent: String,
        /// Child id.
        child: String,
    },
}

impl SceneScript {
    /// Parse a script from JSON text.
    pub fn from_json(text: &str) -> SyncResult<Self> {
        let script: Self = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    /// Check the declarations for problems detectable before running.
    pub fn validate(&self) -> SyncResult<()> {
        if self.name.trim().is_empty() {
            return Err(SyncError::validation("scene name must be non-empty"));
        }
        let mut seen = HashSet::new();
        for obj in &self.objects {
            if !seen.insert(obj.id.as_str()) {
                return Err(SyncError::validation(format!(
                    "object id '{}' is declared twice",
                    obj.id
                )));
            }
            let kinds = usize::from(obj.shape.is_some())
                + usize::from(obj.image.is_some())
                + usize::from(obj.tracker.is_some());
            if kinds > 1 {
                return Err(SyncError::validation(format!(
                    "object '{}' declares more than one of shape, image and tracker",
                    obj.id
                )));
            }
            if kinds == 1 && !obj.children.is_empty() {
                return Err(SyncError::validation(format!(
                    "object '{}' has children but is not a group",
                    obj.id
                )));
            }
            if let Some(img) = &obj.image
                && (img.width <= 0.0 || img.height <= 0.0)
            {
                return Err(SyncError::validation(format!(
                    "image '{}' must have positive width and height",
                    obj.id
                )));
            }
        }
        Ok(())
    }

    /// Run the script against `builder`, resolving relative asset paths against `base_dir`.
    pub fn run(&self, builder: &mut SceneBuilder, base_dir: &Path) -> SyncResult<()> {
        builder.set_name(self.name.clone());
        if let Some(bg) = self.background_color {
            builder.set_background(bg);
        }

        let mut keys: HashMap<String, ObjectKey> = HashMap::new();
        for spec in &self.objects {
            let object = build_object(spec, &keys, base_dir)?;
            let key = builder.create(object)?;
            if let Some(at) = spec.at {
                builder.place(key, at)?;
            }
            keys.insert(spec.id.clone(), key);
        }

        for (i, step) in self.steps.iter().enumerate() {
            run_step(step, builder, &mut keys).map_err(|e| {
                SyncError::Other(anyhow::Error::new(e).context(format!("step {i}")))
            })?;
        }
        Ok(())
    }
}

fn lookup(keys: &HashMap<String, ObjectKey>, id: &str) -> SyncResult<ObjectKey> {
    keys.get(id)
        .copied()
        .ok_or_else(|| SyncError::validation(format!("unknown object id '{id}'")))
}

fn build_object(
    spec: &ObjectSpec,
    keys: &HashMap<String, ObjectKey>,
    base_dir: &Path,
) -> SyncResult<SceneObject> {
    let mut object = if let Some(shape) = &spec.shape {
        let class = spec.class.as_deref().unwrap_or(shape.default_class());
        let obj = SceneObject::vector(class, shape.points());
        match spec.style {
            Some(style) => obj.with_style(style),
            None => obj,
        }
    } else if let Some(img) = &spec.image {
        let path = if img.path.is_absolute() {
            img.path.clone()
        } else {
            base_dir.join(&img.path)
        };
        let mut obj = SceneObject::image(path, img.width, img.height);
        if let Some(class) = &spec.class {
            obj.class_name = class.clone();
        }
        obj
    } else if let Some(value) = spec.tracker {
        SceneObject::tracker(value)
    } else {
        let children = spec
            .children
            .iter()
            .map(|c| lookup(keys, c))
            .collect::<SyncResult<Vec<_>>>()?;
        SceneObject::group(spec.class.as_deref().unwrap_or("VGroup"), children)
    };

    object.args = spec
        .args
        .iter()
        .map(|a| {
            Ok(match a {
                ArgSpec::Ref { id } => ArgValue::Object(lookup(keys, id)?),
                ArgSpec::Scalar(v) => ArgValue::Scalar(*v),
                ArgSpec::Bool(b) => ArgValue::Bool(*b),
                ArgSpec::Text(s) => ArgValue::Text(s.clone()),
            })
        })
        .collect::<SyncResult<Vec<_>>>()?;
    object.config = spec.config.clone();
    Ok(object)
}

fn build_animation(
    spec: &AnimationSpec,
    keys: &HashMap<String, ObjectKey>,
) -> SyncResult<Animation> {
    let (kind, target) = match &spec.kind {
        AnimationSpecKind::Shift { target, vector } => {
            (AnimationKind::Shift { vector: *vector }, Some(target))
        }
        AnimationSpecKind::MoveTo { target, point } => {
            (AnimationKind::MoveTo { point: *point }, Some(target))
        }
        AnimationSpecKind::Rotate {
            target,
            angle,
            axis,
        } => (
            AnimationKind::Rotate {
                angle: *angle,
                axis: *axis,
            },
            Some(target),
        ),
        AnimationSpecKind::Scale { target, factor } => {
            (AnimationKind::Scale { factor: *factor }, Some(target))
        }
        AnimationSpecKind::FadeIn { target } => (AnimationKind::FadeIn, Some(target)),
        AnimationSpecKind::FadeOut { target } => (AnimationKind::FadeOut, Some(target)),
        AnimationSpecKind::SetColor { target, color } => {
            (AnimationKind::SetColor { color: *color }, Some(target))
        }
        AnimationSpecKind::Wait => (AnimationKind::Wait, None),
    };

    let mut anim = match target {
        Some(id) => Animation::new(kind, lookup(keys, id)?),
        None => Animation::wait(1.0),
    };
    if let Some(run_time) = spec.run_time {
        anim = anim.with_run_time(run_time);
    }
    if let Some(rate_func) = spec.rate_func {
        anim = anim.with_rate_func(rate_func);
    }
    Ok(anim)
}

fn run_step(
    step: &StepSpec,
    builder: &mut SceneBuilder,
    keys: &mut HashMap<String, ObjectKey>,
) -> SyncResult<()> {
    match step {
        StepSpec::Add { target } => builder.add(lookup(keys, target)?),
        StepSpec::Remove { target } => builder.remove(lookup(keys, target)?),
        StepSpec::Play { animations } => {
            let anims = animations
                .iter()
                .map(|a| build_animation(a, keys))
                .collect::<SyncResult<Vec<_>>>()?;
            builder.play(anims)
        }
        StepSpec::Wait { seconds } => builder.wait(*seconds),
        StepSpec::Copy { source, id } => {
            if keys.contains_key(id) {
                return Err(SyncError::validation(format!(
                    "object id '{id}' is already in use"
                )));
            }
            let copy = builder.copy(lookup(keys, source)?)?;
            keys.insert(id.clone(), copy);
            Ok(())
        }
        StepSpec::Shift { target, vector } => builder.shift(lookup(keys, target)?, *vector),
        StepSpec::Rotate {
            target,
            angle,
            axis,
        } => builder.rotate(lookup(keys, target)?, *angle, *axis),
        StepSpec::Scale { target, factor } => builder.scale(lookup(keys, target)?, *factor),
        StepSpec::Attach { parent, child } => {
            builder.add_submobject(lookup(keys, parent)?, lookup(keys, child)?)
        }
    }
}

/// Scene program stored as a JSON script on disk, re-read on every load.
#[derive(Clone, Debug)]
pub struct ScriptSource {
    path: PathBuf,
}

impl ScriptSource {
    /// Script at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Script file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SceneSource for ScriptSource {
    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    fn load(&self, opts: &SceneOpts) -> SyncResult<RecordedScene> {
        self.run_script(opts)
            .map_err(|e| SyncError::load(self.path.display().to_string(), e))
    }
}

impl ScriptSource {
    fn run_script(&self, opts: &SceneOpts) -> anyhow::Result<RecordedScene> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading scene script {}", self.path.display()))?;
        let script = SceneScript::from_json(&text)
            .with_context(|| format!("parsing scene script {}", self.path.display()))?;
        let base_dir = self.path.parent().unwrap_or(Path::new("."));
        let mut builder = SceneBuilder::new(script.name.clone(), opts);
        script
            .run(&mut builder, base_dir)
            .with_context(|| format!("running scene script {}", self.path.display()))?;
        Ok(builder.finish())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/script.rs"]
mod tests;
