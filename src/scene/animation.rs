use crate::foundation::core::{ObjectKey, Rgba, Vec3};
use crate::scene::ease::RateFunc;
use crate::scene::graph::SceneGraph;
use crate::scene::object::TransformRecord;

/// What an animation does to its target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationKind {
    /// Translate by `vector`.
    Shift {
        /// Offset applied over the animation.
        vector: Vec3,
    },
    /// Translate so the target's center ends at `point`.
    MoveTo {
        /// Destination of the target's center.
        point: Vec3,
    },
    /// Rotate about the target's center.
    Rotate {
        /// Total angle in radians.
        angle: f64,
        /// Rotation axis.
        axis: Vec3,
    },
    /// Scale about the target's center.
    Scale {
        /// Final scale factor.
        factor: f64,
    },
    /// Fade from transparent to the target's own opacity; attaches the target.
    FadeIn,
    /// Fade to transparent; detaches the target when done.
    FadeOut,
    /// Blend fill and stroke colors towards `color`.
    SetColor {
        /// Final color.
        color: Rgba,
    },
    /// Hold the scene still.
    Wait,
}

/// One animation played as part of a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    /// Effect of the animation.
    pub kind: AnimationKind,
    /// Animated object; `None` only for [`AnimationKind::Wait`].
    pub target: Option<ObjectKey>,
    /// Duration in seconds.
    pub run_time: f64,
    /// Progress-to-alpha mapping.
    pub rate_func: RateFunc,
    /// Translation fixed when the segment was recorded.
    resolved_shift: Option<Vec3>,
}

impl Animation {
    /// `kind` applied to `target` over one second with the default rate function.
    pub fn new(kind: AnimationKind, target: ObjectKey) -> Self {
        Self {
            kind,
            target: Some(target),
            run_time: 1.0,
            rate_func: RateFunc::Smooth,
            resolved_shift: None,
        }
    }

    /// Translate `target` by `vector`.
    pub fn shift(target: ObjectKey, vector: Vec3) -> Self {
        Self::new(AnimationKind::Shift { vector }, target)
    }

    /// Move `target`'s center to `point`.
    pub fn move_to(target: ObjectKey, point: Vec3) -> Self {
        Self::new(AnimationKind::MoveTo { point }, target)
    }

    /// Rotate `target` by `angle` radians about `axis`.
    pub fn rotate(target: ObjectKey, angle: f64, axis: Vec3) -> Self {
        Self::new(AnimationKind::Rotate { angle, axis }, target)
    }

    /// Scale `target` by `factor`.
    pub fn scale(target: ObjectKey, factor: f64) -> Self {
        Self::new(AnimationKind::Scale { factor }, target)
    }

    /// Fade `target` in.
    pub fn fade_in(target: ObjectKey) -> Self {
        Self::new(AnimationKind::FadeIn, target)
    }

    /// Fade `target` out.
    pub fn fade_out(target: ObjectKey) -> Self {
        Self::new(AnimationKind::FadeOut, target)
    }

    /// Recolor `target`.
    pub fn set_color(target: ObjectKey, color: Rgba) -> Self {
        Self::new(AnimationKind::SetColor { color }, target)
    }

    /// Hold still for `seconds`.
    pub fn wait(seconds: f64) -> Self {
        Self {
            kind: AnimationKind::Wait,
            target: None,
            run_time: seconds,
            rate_func: RateFunc::Linear,
            resolved_shift: None,
        }
    }

    /// Override the duration.
    pub fn with_run_time(mut self, seconds: f64) -> Self {
        self.run_time = seconds;
        self
    }

    /// Override the rate function.
    pub fn with_rate_func(mut self, rate_func: RateFunc) -> Self {
        self.rate_func = rate_func;
        self
    }

    /// Class name reported to renderers.
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            AnimationKind::Shift { .. } => "Shift",
            AnimationKind::MoveTo { .. } => "MoveTo",
            AnimationKind::Rotate { .. } => "Rotate",
            AnimationKind::Scale { .. } => "Scale",
            AnimationKind::FadeIn => "FadeIn",
            AnimationKind::FadeOut => "FadeOut",
            AnimationKind::SetColor { .. } => "SetColor",
            AnimationKind::Wait => "Wait",
        }
    }

    /// Return `true` if playing this animation attaches its target to the scene.
    pub fn is_introducer(&self) -> bool {
        matches!(self.kind, AnimationKind::FadeIn)
    }

    /// Return `true` if finishing this animation detaches its target from the scene.
    pub fn is_remover(&self) -> bool {
        matches!(self.kind, AnimationKind::FadeOut)
    }

    /// Interpolation alpha after `offset` seconds of this animation.
    pub fn alpha_at(&self, offset: f64) -> f64 {
        if self.run_time <= 0.0 {
            return self.rate_func.apply(1.0);
        }
        self.rate_func.apply(offset / self.run_time)
    }

    /// Fix the translation of a move against `scene`, the state this animation starts from once
    /// the animations listed before it in the same segment have finished.
    ///
    /// Replaying the segment from its keyframe then ends where recording ended.
    pub fn resolve(&mut self, scene: &SceneGraph) {
        if let (AnimationKind::MoveTo { point }, Some(target)) = (self.kind, self.target) {
            self.resolved_shift = Some(point - scene.center(target));
        }
    }

    /// Translation this animation applies at completion.
    ///
    /// Moves use the translation fixed by [`Animation::resolve`], or measure against `base` when
    /// unresolved.
    pub fn total_shift(&self, base: &SceneGraph) -> Option<Vec3> {
        let target = self.target?;
        match self.kind {
            AnimationKind::Shift { vector } => Some(vector),
            AnimationKind::MoveTo { point } => {
                Some(self.resolved_shift.unwrap_or_else(|| point - base.center(target)))
            }
            _ => None,
        }
    }

    /// Apply this animation at `alpha` to `scene`, whose target family must currently hold the
    /// start state recorded in `base`.
    pub fn apply_at(&self, base: &SceneGraph, scene: &mut SceneGraph, alpha: f64) {
        let Some(target) = self.target else {
            return;
        };
        match self.kind {
            AnimationKind::Shift { .. } | AnimationKind::MoveTo { .. } => {
                if let Some(delta) = self.total_shift(base) {
                    scene.shift(target, delta * alpha);
                }
            }
            AnimationKind::Rotate { angle, axis } => scene.rotate(target, angle * alpha, axis),
            AnimationKind::Scale { factor } => scene.scale(target, 1.0 + (factor - 1.0) * alpha),
            AnimationKind::FadeIn | AnimationKind::FadeOut => {
                let k = if self.is_introducer() { alpha } else { 1.0 - alpha };
                for key in base.family(target) {
                    let Some((fill, stroke)) = base.get(key).and_then(|o| o.opacities()) else {
                        continue;
                    };
                    if let Some(obj) = scene.get_mut(key) {
                        obj.set_opacities(fill * k, stroke * k);
                    }
                }
            }
            AnimationKind::SetColor { color } => {
                for key in base.family(target) {
                    let Some(start) = base.get(key).and_then(|o| o.style()).copied() else {
                        continue;
                    };
                    if let Some(style) = scene.get_mut(key).and_then(|o| o.style_mut()) {
                        style.fill_color = lerp_color(start.fill_color, color, alpha);
                        style.stroke_color = lerp_color(start.stroke_color, color, alpha);
                    }
                }
            }
            AnimationKind::Wait => {}
        }
    }

    /// Play this animation to completion on a live graph.
    ///
    /// Returns the transform the target underwent, for the transformation log.
    pub fn finish(&self, scene: &mut SceneGraph) -> Option<(ObjectKey, TransformRecord)> {
        let target = self.target?;
        let base = scene.clone();
        if self.is_remover() {
            // Removers leave the target's style as it was; only attachment changes.
            scene.remove_root(target);
            return None;
        }
        self.apply_at(&base, scene, 1.0);
        let record = match self.kind {
            AnimationKind::Shift { .. } | AnimationKind::MoveTo { .. } => {
                TransformRecord::Shift {
                    vector: self.total_shift(&base)?,
                }
            }
            AnimationKind::Rotate { angle, axis } => TransformRecord::Rotate { angle, axis },
            AnimationKind::Scale { factor } => TransformRecord::Scale { factor },
            _ => return None,
        };
        Some((target, record))
    }
}

fn lerp_color(a: Rgba, b: Rgba, t: f64) -> Rgba {
    Rgba::rgba(
        a.r + (b.r - a.r) * t,
        a.g + (b.g - a.g) * t,
        a.b + (b.b - a.b) * t,
        a.a + (b.a - a.a) * t,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/scene/animation.rs"]
mod tests;
