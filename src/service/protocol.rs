//! Request and response messages exchanged with renderers.
//!
//! Messages travel as one JSON object per line. Requests are `{"method": ..., "params": ...}`;
//! replies are `{"frame": ...}`, `{"scene": ...}` or `{"error": {"message": ...}}`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::foundation::core::{ObjectId, Rgba, Vec3};
use crate::scene::object::{ObjectKind, SceneObject};
use crate::sync::diff::Diff;
use crate::sync::snapshot::point_hash;

/// Seek into the timeline and report what changed.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRequest {
    /// Requested segment.
    pub animation_index: usize,
    /// Requested offset in seconds into the segment.
    pub animation_offset: f64,
    /// Exclusive end of the segment range being played; 0 means every segment.
    #[serde(default)]
    pub end_index: usize,
    /// The renderer has no state yet and needs everything.
    #[serde(default)]
    pub first_request: bool,
}

/// Paint style sent with each object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StyleData {
    /// Fill color.
    pub fill_color: Rgba,
    /// Fill opacity.
    pub fill_opacity: f64,
    /// Stroke color; vectorized objects only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<Rgba>,
    /// Stroke opacity; vectorized objects only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    /// Stroke width; vectorized objects only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

/// Per-variant object payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MobjectPayload {
    /// Vectorized path.
    Vectorized {
        /// Path points.
        points: Vec<Vec3>,
        /// The points changed since the object was last sent.
        needs_redraw: bool,
    },
    /// Raster image.
    Image {
        /// Path relative to the assets root; omitted when the file lives outside it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Width in scene units.
        width: f64,
        /// Height in scene units.
        height: f64,
        /// Center in scene space.
        center: Vec3,
    },
}

/// One object as a renderer needs it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MobjectData {
    /// Registry id.
    pub id: ObjectId,
    /// Registry name.
    pub name: String,
    /// Authoring class.
    pub class_name: String,
    /// Variant payload.
    #[serde(flatten)]
    pub payload: MobjectPayload,
    /// Paint style.
    pub style: StyleData,
}

impl MobjectData {
    /// Describe `object` for a renderer, or `None` if it is not drawable.
    ///
    /// `point_hashes` remembers the last geometry sent per id and drives `needs_redraw`.
    pub fn from_object(
        object: &SceneObject,
        id: ObjectId,
        name: &str,
        assets_dir: &Path,
        point_hashes: &mut HashMap<ObjectId, u64>,
    ) -> Option<Self> {
        let (payload, style) = match &object.kind {
            ObjectKind::Vector(v) if !v.points.is_empty() => {
                let hash = point_hash(&v.points);
                let needs_redraw = point_hashes.insert(id, hash) != Some(hash);
                (
                    MobjectPayload::Vectorized {
                        points: v.points.clone(),
                        needs_redraw,
                    },
                    StyleData {
                        fill_color: v.style.fill_color,
                        fill_opacity: v.style.fill_opacity,
                        stroke_color: Some(v.style.stroke_color),
                        stroke_opacity: Some(v.style.stroke_opacity),
                        stroke_width: Some(v.style.stroke_width),
                    },
                )
            }
            ObjectKind::Image(img) => (
                MobjectPayload::Image {
                    path: relative_asset_path(&img.path, assets_dir),
                    width: img.width,
                    height: img.height,
                    center: img.center,
                },
                StyleData {
                    fill_color: img.fill_color,
                    fill_opacity: img.fill_opacity,
                    stroke_color: None,
                    stroke_opacity: None,
                    stroke_width: None,
                },
            ),
            _ => return None,
        };
        Some(Self {
            id,
            name: name.to_owned(),
            class_name: object.class_name.clone(),
            payload,
            style,
        })
    }
}

/// `path` relative to `assets_dir`, with `/` separators.
///
/// Both sides are resolved with [`absolute_path`] first. Paths outside the assets root are
/// logged and yield `None`.
pub fn relative_asset_path(path: &Path, assets_dir: &Path) -> Option<String> {
    let path = absolute_path(path);
    let root = absolute_path(assets_dir);
    match path.strip_prefix(&root) {
        Ok(rel) => Some(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        ),
        Err(_) => {
            tracing::warn!(
                path = %path.display(),
                assets_dir = %root.display(),
                "expected image path to be under the assets dir"
            );
            None
        }
    }
}

/// `path` made absolute against the working directory, with `.` and `..` folded lexically.
///
/// The filesystem is not consulted, so the path does not have to exist.
pub fn absolute_path(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Kind of an update operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Replace the renderer's copy of the object.
    Redraw,
}

/// In-place update of an object the renderer already has.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct UpdateOp {
    /// Updated object.
    pub id: ObjectId,
    /// Update kind.
    pub kind: UpdateKind,
    /// Full new state.
    pub redraw: MobjectData,
    /// Field-level changes that triggered the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
}

/// Start and end values of one interpolated attribute.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TweenData {
    /// Interpolated attribute, `position` or `opacity`.
    pub attribute: String,
    /// Value at the start of the animation.
    pub start_data: Vec<f64>,
    /// Value at the end of the animation.
    pub end_data: Vec<f64>,
}

/// Offset of one family member from the animated root's center.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TweenInfo {
    /// Family member.
    pub id: ObjectId,
    /// Member center minus root center.
    pub root_mobject_offset: Vec3,
}

/// An animation the renderer can interpolate on its own.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationInfo {
    /// Animation class.
    pub name: String,
    /// Segment duration.
    pub duration: f64,
    /// Rate function name.
    pub easing_function: String,
    /// Interpolated attributes.
    pub tween_data: Vec<TweenData>,
    /// Per-member offsets.
    pub tween_info: Vec<TweenInfo>,
}

/// Reply to [`FrameRequest`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameResponse {
    /// Ids the renderer should drop.
    pub remove_ids: Vec<ObjectId>,
    /// Objects the renderer should add.
    pub add_mobjects: Vec<MobjectData>,
    /// Objects the renderer should update in place.
    pub update_ops: Vec<UpdateOp>,
    /// Animations the renderer can tween itself.
    pub animations: Vec<AnimationInfo>,
    /// Resolved segment.
    pub animation_index: usize,
    /// Resolved offset.
    pub animation_offset: f64,
    /// The requested range has been played to its end.
    pub scene_finished: bool,
    /// Every animation of the segment carries tween data.
    pub all_animations_tweened: bool,
}

/// Summary of one segment.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SegmentInfo {
    /// First animation class, with `...` when there are several.
    pub name: String,
    /// Duration in seconds.
    pub duration: f64,
}

/// Whole-scene description.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneDescription {
    /// Scene name.
    pub name: String,
    /// Background color as `#RRGGBB`.
    pub background_color: String,
    /// Segments in order.
    pub segments: Vec<SegmentInfo>,
}

/// Scene description, or the error that prevented loading the scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneData {
    /// Description of the loaded scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneDescription>,
    /// The scene program failed.
    #[serde(default)]
    pub has_exception: bool,
    /// Formatted error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl SceneData {
    /// Data for a loaded scene.
    pub fn loaded(scene: SceneDescription) -> Self {
        Self {
            scene: Some(scene),
            has_exception: false,
            exception: None,
        }
    }

    /// Data for a failed load.
    pub fn failed(trace: impl Into<String>) -> Self {
        Self {
            scene: None,
            has_exception: true,
            exception: Some(trace.into()),
        }
    }
}

/// Requests accepted by the frame server.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcRequest {
    /// Seek and diff.
    GetFrameAtTime(FrameRequest),
    /// Describe the scene.
    FetchSceneData,
}

/// Replies sent by the frame server.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcReply {
    /// Reply to `GetFrameAtTime`.
    Frame(FrameResponse),
    /// Reply to `FetchSceneData`.
    Scene(SceneData),
    /// Failure.
    Error {
        /// Human-readable message.
        message: String,
    },
}

/// Messages pushed to a renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RendererMessage {
    /// The scene was (re)loaded.
    UpdateSceneData(SceneData),
}

#[cfg(test)]
#[path = "../../tests/unit/service/protocol.rs"]
mod tests;
