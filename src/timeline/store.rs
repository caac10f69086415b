use std::sync::Arc;

use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::animation::Animation;
use crate::scene::graph::SceneGraph;

/// Scene state at the start of one animation segment, with the animations played in it.
#[derive(Clone, Debug)]
pub struct Keyframe {
    /// Position in the timeline.
    pub index: usize,
    /// Independent copy of the whole scene graph at segment start.
    pub scene: SceneGraph,
    /// Animations played during the segment.
    pub animations: Vec<Animation>,
    /// Segment length in seconds.
    pub duration: f64,
}

impl Keyframe {
    /// Display name: the first animation's class, with `...` appended when there are several.
    pub fn name(&self) -> String {
        match self.animations.as_slice() {
            [] => String::new(),
            [only] => only.class_name().to_owned(),
            [first, ..] => format!("{}...", first.class_name()),
        }
    }

    /// Materialize this keyframe at `offset` seconds into `scene`.
    ///
    /// Every animated family is first reset to its start state, so calling this repeatedly on the
    /// same graph gives the same result as calling it once on a fresh copy.
    pub fn materialize_into(&self, scene: &mut SceneGraph, offset: f64) {
        for anim in &self.animations {
            let Some(target) = anim.target else {
                continue;
            };
            for key in self.scene.family(target) {
                if let Some(obj) = self.scene.get(key) {
                    scene.replace(obj.clone());
                }
            }
        }
        for anim in &self.animations {
            anim.apply_at(&self.scene, scene, anim.alpha_at(offset));
        }
    }
}

/// Keyframe copy materialized at a given offset: the single-slot seek cache.
#[derive(Clone, Debug)]
pub struct MaterializedScene {
    /// Segment the scene belongs to.
    pub segment: usize,
    /// Offset the scene was last materialized at.
    pub offset: f64,
    /// Keyframe the scene was copied from.
    pub base: Arc<Keyframe>,
    /// Interpolated scene.
    pub scene: SceneGraph,
}

/// Resolved seek position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekOutcome {
    /// Segment actually materialized.
    pub segment: usize,
    /// Offset actually materialized.
    pub offset: f64,
    /// Whether the seek reached the end of the requested range.
    pub scene_finished: bool,
    /// Whether the cached scene was reused instead of copying a keyframe.
    pub used_cache: bool,
}

/// Ordered keyframes of one recorded scene, plus the seek cache.
#[derive(Clone, Debug, Default)]
pub struct TimelineStore {
    keyframes: Vec<Arc<Keyframe>>,
    cache: Option<MaterializedScene>,
    copies: usize,
}

impl TimelineStore {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment starting from `scene`.
    pub fn record_segment(
        &mut self,
        scene: SceneGraph,
        animations: Vec<Animation>,
        duration: f64,
    ) -> Arc<Keyframe> {
        let keyframe = Arc::new(Keyframe {
            index: self.keyframes.len(),
            scene,
            animations,
            duration: duration.max(0.0),
        });
        self.keyframes.push(Arc::clone(&keyframe));
        keyframe
    }

    /// Recorded keyframes in order.
    pub fn keyframes(&self) -> &[Arc<Keyframe>] {
        &self.keyframes
    }

    /// Number of recorded segments.
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Return `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Total duration of all segments.
    pub fn duration(&self) -> f64 {
        self.keyframes.iter().map(|k| k.duration).sum()
    }

    /// Segment currently held by the cache.
    pub fn cached_segment(&self) -> Option<usize> {
        self.cache.as_ref().map(|c| c.segment)
    }

    /// The cached materialized scene, if any seek happened.
    pub fn materialized(&self) -> Option<&MaterializedScene> {
        self.cache.as_ref()
    }

    /// Number of keyframe copies taken so far.
    pub fn copy_count(&self) -> usize {
        self.copies
    }

    /// Resolve `(segment, offset)` against segments `[0, end_index)` and materialize it.
    ///
    /// `end_index` of 0, or past the recorded count, means every segment. Out-of-range segments
    /// clamp to the end of the last segment in range and finish the scene; negative offsets clamp
    /// to 0. An offset past the segment's duration moves on to the next segment, or finishes the
    /// scene at the last one.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn seek(
        &mut self,
        segment: usize,
        offset: f64,
        end_index: usize,
        first_request: bool,
    ) -> SyncResult<SeekOutcome> {
        if self.keyframes.is_empty() {
            return Err(SyncError::seek("timeline has no recorded segments"));
        }
        let count = self.keyframes.len();
        let end = if end_index == 0 || end_index > count {
            count
        } else {
            end_index
        };

        let mut scene_finished = false;
        let mut segment = segment;
        let mut offset = if offset.is_nan() { 0.0 } else { offset.max(0.0) };
        if segment >= end {
            segment = end - 1;
            offset = self.keyframes[segment].duration;
            scene_finished = true;
        }

        let duration = self.keyframes[segment].duration;
        if offset > duration {
            if segment + 1 < end {
                segment += 1;
                offset = 0.0;
            } else {
                offset = duration;
                scene_finished = true;
            }
        }

        let used_cache = self.cached_segment() == Some(segment);
        if let Some(cache) = self.cache.as_mut().filter(|_| used_cache) {
            cache.base.materialize_into(&mut cache.scene, offset);
            cache.offset = offset;
        } else {
            let base = Arc::clone(&self.keyframes[segment]);
            let mut scene = base.scene.clone();
            self.copies += 1;
            base.materialize_into(&mut scene, offset);
            self.cache = Some(MaterializedScene {
                segment,
                offset,
                base,
                scene,
            });
        }
        if first_request {
            tracing::debug!(segment, offset, "first request resolved");
        }

        Ok(SeekOutcome {
            segment,
            offset,
            scene_finished,
            used_cache,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/store.rs"]
mod tests;
