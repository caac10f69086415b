use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::foundation::core::{ObjectId, ObjectKey, Rgba, Vec3};
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::animation::{Animation, AnimationKind};
use crate::scene::graph::SceneGraph;
use crate::scene::program::{RecordedScene, SceneOpts, SceneSource};
use crate::service::protocol::{
    AnimationInfo, FrameRequest, FrameResponse, MobjectData, SceneData, SceneDescription,
    SegmentInfo, TweenData, TweenInfo, UpdateKind, UpdateOp, absolute_path,
};
use crate::service::renderer::{RendererLauncher, RendererLink};
use crate::sync::context::{SyncContext, root_family_set};
use crate::timeline::store::TimelineStore;

/// Lifecycle of the frame service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    /// No scene was loaded yet.
    Uninitialized,
    /// A scene is loaded but no frame was served from it.
    Loaded,
    /// Frames are being served from the loaded scene.
    Serving,
    /// The last load failed; only a successful reload leaves this state.
    Errored,
}

/// What a reload did about the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A running renderer was told about the new scene.
    Notified,
    /// No renderer was listening, so one was launched.
    Spawned,
    /// No renderer was listening and none is configured; the server keeps waiting for one.
    Unreachable,
    /// Launching a renderer failed; the service stopped accepting connections.
    Stopped,
}

/// Settings of a [`FrameService`].
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceOpts {
    /// Options for running the scene program.
    pub scene: SceneOpts,
    /// Root that image paths are reported relative to.
    pub assets_dir: PathBuf,
    /// Background reported when the scene sets none.
    pub default_background: Rgba,
}

impl Default for ServiceOpts {
    fn default() -> Self {
        Self {
            scene: SceneOpts::default(),
            assets_dir: PathBuf::from("assets"),
            default_background: Rgba::BLACK,
        }
    }
}

/// Mutable serving state of one generation.
struct ServeSession {
    timeline: TimelineStore,
    ctx: SyncContext,
    served: Vec<ObjectId>,
    point_hashes: HashMap<ObjectId, u64>,
}

/// Everything one successful load produced.
struct Generation {
    description: SceneDescription,
    session: Mutex<ServeSession>,
    serving: AtomicBool,
}

impl Generation {
    fn new(scene: RecordedScene, default_background: Rgba) -> Self {
        let description = SceneDescription {
            name: scene.name,
            background_color: scene
                .background_color
                .unwrap_or(default_background)
                .to_hex(),
            segments: scene
                .timeline
                .keyframes()
                .iter()
                .map(|k| SegmentInfo {
                    name: k.name(),
                    duration: k.duration,
                })
                .collect(),
        };
        Self {
            description,
            session: Mutex::new(ServeSession {
                timeline: scene.timeline,
                ctx: scene.ctx,
                served: Vec::new(),
                point_hashes: HashMap::new(),
            }),
            serving: AtomicBool::new(false),
        }
    }
}

enum ServiceState {
    Uninitialized,
    Ready(Arc<Generation>),
    Errored(String),
}

/// Serves frames of a re-loadable scene program to renderers.
///
/// The loaded scene lives in an immutable generation swapped atomically on reload. Requests pin
/// the generation they started on, so a reload never changes the state a request is reading.
pub struct FrameService {
    source: Arc<dyn SceneSource>,
    opts: ServiceOpts,
    link: Arc<dyn RendererLink>,
    launcher: Option<RendererLauncher>,
    renderer: Mutex<Option<Child>>,
    state: RwLock<ServiceState>,
    reload: Mutex<()>,
    accepting: AtomicBool,
}

impl std::fmt::Debug for FrameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameService")
            .field("status", &self.status())
            .field("renderer", &self.link.endpoint())
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

impl FrameService {
    /// Create a service for `source`. Nothing is loaded until [`FrameService::start`] or
    /// [`FrameService::load_scene_program`].
    ///
    /// A relative `opts.assets_dir` is resolved against the current working directory here.
    pub fn new(
        source: Arc<dyn SceneSource>,
        mut opts: ServiceOpts,
        link: Arc<dyn RendererLink>,
        launcher: Option<RendererLauncher>,
    ) -> Self {
        opts.assets_dir = absolute_path(&opts.assets_dir);
        Self {
            source,
            opts,
            link,
            launcher,
            renderer: Mutex::new(None),
            state: RwLock::new(ServiceState::Uninitialized),
            reload: Mutex::new(()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Scene program served.
    pub fn source(&self) -> &Arc<dyn SceneSource> {
        &self.source
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ServiceStatus {
        match &*read(&self.state) {
            ServiceState::Uninitialized => ServiceStatus::Uninitialized,
            ServiceState::Errored(_) => ServiceStatus::Errored,
            ServiceState::Ready(g) if g.serving.load(Ordering::Acquire) => ServiceStatus::Serving,
            ServiceState::Ready(_) => ServiceStatus::Loaded,
        }
    }

    /// Whether the server should keep accepting connections.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stop accepting connections.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Re-execute the scene program and swap in the result.
    ///
    /// The program runs without any lock held. On failure the previous generation is dropped
    /// and the error chain is kept for [`FrameService::fetch_scene_data`].
    #[tracing::instrument(level = "info", skip(self))]
    pub fn load_scene_program(&self) -> SyncResult<()> {
        let loaded = self.source.load(&self.opts.scene);
        let (next, result) = match loaded {
            Ok(scene) => {
                tracing::info!(
                    scene = %scene.name,
                    segments = scene.timeline.len(),
                    "scene loaded"
                );
                let generation = Generation::new(scene, self.opts.default_background);
                (ServiceState::Ready(Arc::new(generation)), Ok(()))
            }
            Err(err) => {
                let trace = err.trace_text();
                tracing::warn!(error = %trace, "scene failed to load");
                (ServiceState::Errored(trace), Err(err))
            }
        };
        *write(&self.state) = next;
        result
    }

    /// Load the scene for the first time and tell the renderer about it.
    pub fn start(&self) -> ReloadOutcome {
        self.reload_and_notify()
    }

    /// Reload after the scene source changed, then tell the renderer.
    pub fn on_file_changed(&self) -> ReloadOutcome {
        self.reload_and_notify()
    }

    fn reload_and_notify(&self) -> ReloadOutcome {
        let _serial = self.reload.lock().unwrap_or_else(|p| p.into_inner());
        // Load failures are already recorded and are reported to the renderer below.
        let _ = self.load_scene_program();
        self.notify_renderer()
    }

    fn notify_renderer(&self) -> ReloadOutcome {
        let data = self.fetch_scene_data();
        let err = match self.link.notify(&data) {
            Ok(()) => return ReloadOutcome::Notified,
            Err(err) => err,
        };
        tracing::warn!(
            endpoint = %self.link.endpoint(),
            error = %err,
            "no renderer was detected"
        );

        let Some(launcher) = &self.launcher else {
            return ReloadOutcome::Unreachable;
        };
        let mut renderer = self.renderer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(child) = renderer.as_mut() {
            match child.try_wait() {
                Ok(None) => {
                    tracing::info!(pid = child.id(), "launched renderer is still starting");
                    return ReloadOutcome::Spawned;
                }
                Ok(Some(status)) => tracing::info!(%status, "launched renderer exited"),
                Err(err) => tracing::warn!(error = %err, "could not poll launched renderer"),
            }
            *renderer = None;
        }
        match launcher.spawn() {
            Ok(child) => {
                *renderer = Some(child);
                ReloadOutcome::Spawned
            }
            Err(err) => {
                tracing::info!(
                    error = %err,
                    "install a renderer or point renderer_path at one; shutting down"
                );
                self.stop_accepting();
                ReloadOutcome::Stopped
            }
        }
    }

    /// Process id of the renderer this service launched, while it is still running.
    pub fn launched_renderer(&self) -> Option<u32> {
        let mut renderer = self.renderer.lock().unwrap_or_else(|p| p.into_inner());
        let child = renderer.as_mut()?;
        match child.try_wait() {
            Ok(None) => Some(child.id()),
            _ => {
                *renderer = None;
                None
            }
        }
    }

    /// Describe the served scene, or the error that prevented loading it.
    pub fn fetch_scene_data(&self) -> SceneData {
        match &*read(&self.state) {
            ServiceState::Ready(g) => SceneData::loaded(g.description.clone()),
            ServiceState::Errored(trace) => SceneData::failed(trace.clone()),
            ServiceState::Uninitialized => SceneData::failed("Error: no scene has been loaded"),
        }
    }

    /// Bind to the currently served generation.
    pub fn pin(&self) -> SyncResult<ServingHandle> {
        match &*read(&self.state) {
            ServiceState::Ready(g) => Ok(ServingHandle {
                generation: Arc::clone(g),
                assets_dir: self.opts.assets_dir.clone(),
            }),
            ServiceState::Errored(_) => Err(SyncError::unavailable("the last scene load failed")),
            ServiceState::Uninitialized => Err(SyncError::unavailable("no scene loaded yet")),
        }
    }

    /// Seek into the served scene and compute the renderer update.
    pub fn get_frame_at_time(&self, request: FrameRequest) -> SyncResult<FrameResponse> {
        self.pin()?.get_frame_at_time(request)
    }
}

/// Handle on one loaded generation; requests made through it never observe a later reload.
#[derive(Clone)]
pub struct ServingHandle {
    generation: Arc<Generation>,
    assets_dir: PathBuf,
}

impl std::fmt::Debug for ServingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingHandle")
            .field("scene", &self.generation.description.name)
            .finish_non_exhaustive()
    }
}

impl ServingHandle {
    /// Description of the pinned scene.
    pub fn description(&self) -> &SceneDescription {
        &self.generation.description
    }

    /// Keyframe copies taken by the pinned generation so far.
    pub fn copy_count(&self) -> usize {
        self.session().timeline.copy_count()
    }

    fn session(&self) -> MutexGuard<'_, ServeSession> {
        self.generation
            .session
            .lock()
            .unwrap_or_else(|p| p.into_inner())
    }

    /// Seek and diff against the pinned generation.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_frame_at_time(&self, request: FrameRequest) -> SyncResult<FrameResponse> {
        let mut session = self.session();
        let response = session.frame(request, &self.assets_dir)?;
        self.generation.serving.store(true, Ordering::Release);
        Ok(response)
    }
}

impl ServeSession {
    fn frame(
        &mut self,
        request: FrameRequest,
        assets_dir: &std::path::Path,
    ) -> SyncResult<FrameResponse> {
        let seek = self.timeline.seek(
            request.animation_index,
            request.animation_offset,
            request.end_index,
            request.first_request,
        )?;
        let materialized = self
            .timeline
            .materialized()
            .ok_or_else(|| SyncError::seek("seek left no materialized scene"))?;
        let scene = materialized.scene.clone();
        let base = Arc::clone(&materialized.base);
        let roots = root_family_set(&scene);

        let mut response = FrameResponse {
            animation_index: seek.segment,
            animation_offset: seek.offset,
            scene_finished: seek.scene_finished,
            ..FrameResponse::default()
        };

        if request.first_request || !seek.used_cache {
            let mut changed = HashMap::new();
            for key in scene.keys().collect::<Vec<_>>() {
                let obs = self.ctx.observe(key, &scene, &roots)?;
                if !obs.diff.is_empty() {
                    changed.insert(obs.id, obs.diff);
                }
            }

            let current: Vec<(ObjectId, ObjectKey)> = scene
                .root_family()
                .into_iter()
                .filter(|k| scene.get(*k).is_some_and(|o| o.has_points()))
                .filter_map(|k| self.ctx.registry.id_of(k).map(|id| (id, k)))
                .collect();
            let current_ids: Vec<ObjectId> = current.iter().map(|(id, _)| *id).collect();

            if request.first_request {
                response.remove_ids = std::mem::take(&mut self.served);
                for &(id, key) in &current {
                    self.point_hashes.remove(&id);
                    response.add_mobjects.extend(self.mobject(&scene, id, key, assets_dir));
                }
            } else {
                let delta = crate::sync::diff::diff_id_sets(&self.served, &current_ids);
                response.remove_ids = delta.removed;
                for &(id, key) in &current {
                    if delta.added.contains(&id) {
                        response.add_mobjects.extend(self.mobject(&scene, id, key, assets_dir));
                    } else if let Some(diff) = changed.remove(&id)
                        && let Some(redraw) = self.mobject(&scene, id, key, assets_dir)
                    {
                        response.update_ops.push(UpdateOp {
                            id,
                            kind: UpdateKind::Redraw,
                            redraw,
                            diff: Some(diff),
                        });
                    }
                }
            }
            self.served = current_ids;

            response.all_animations_tweened = true;
            for anim in &base.animations {
                let Some(tween_data) = tween_data(anim, &base.scene) else {
                    response.all_animations_tweened = false;
                    continue;
                };
                response.animations.push(AnimationInfo {
                    name: anim.class_name().to_owned(),
                    duration: base.duration,
                    easing_function: anim.rate_func.name().to_owned(),
                    tween_data,
                    tween_info: self.tween_info(anim, &scene),
                });
            }
        } else {
            response.all_animations_tweened = false;
            for anim in &base.animations {
                let Some(target) = anim.target else {
                    continue;
                };
                if tween_data(anim, &base.scene).is_some() {
                    continue;
                }
                for key in scene.family(target) {
                    let obs = self.ctx.observe(key, &scene, &roots)?;
                    if obs.diff.is_empty() || !obs.required.required {
                        continue;
                    }
                    if let Some(redraw) = self.mobject(&scene, obs.id, key, assets_dir) {
                        response.update_ops.push(UpdateOp {
                            id: obs.id,
                            kind: UpdateKind::Redraw,
                            redraw,
                            diff: Some(obs.diff),
                        });
                    }
                }
            }
        }

        tracing::trace!(
            segment = response.animation_index,
            removed = response.remove_ids.len(),
            added = response.add_mobjects.len(),
            updated = response.update_ops.len(),
            "frame computed"
        );
        Ok(response)
    }

    fn mobject(
        &mut self,
        scene: &SceneGraph,
        id: ObjectId,
        key: ObjectKey,
        assets_dir: &std::path::Path,
    ) -> Option<MobjectData> {
        let object = scene.get(key)?;
        let name = self.ctx.registry.name_of(id).ok()?;
        MobjectData::from_object(object, id, name, assets_dir, &mut self.point_hashes)
    }

    fn tween_info(&self, anim: &Animation, scene: &SceneGraph) -> Vec<TweenInfo> {
        let Some(target) = anim.target else {
            return Vec::new();
        };
        let root_center = scene.center(target);
        scene
            .family(target)
            .into_iter()
            .filter(|k| scene.get(*k).is_some_and(|o| o.has_points()))
            .filter_map(|k| {
                Some(TweenInfo {
                    id: self.ctx.registry.id_of(k)?,
                    root_mobject_offset: scene.center(k) - root_center,
                })
            })
            .collect()
    }
}

/// Attributes a renderer can interpolate on its own for `anim`, measured against the segment's
/// start state. `None` when the animation cannot be tweened.
fn tween_data(anim: &Animation, start: &SceneGraph) -> Option<Vec<TweenData>> {
    let target = anim.target?;
    match anim.kind {
        AnimationKind::Shift { .. } | AnimationKind::MoveTo { .. } => {
            let from = start.center(target);
            let to: Vec3 = from + anim.total_shift(start)?;
            Some(vec![TweenData {
                attribute: "position".to_owned(),
                start_data: from.to_array().to_vec(),
                end_data: to.to_array().to_vec(),
            }])
        }
        AnimationKind::FadeIn => {
            let opacity = start
                .family(target)
                .into_iter()
                .find_map(|k| start.get(k)?.opacities())
                .map_or(1.0, |(fill, _)| fill);
            Some(vec![TweenData {
                attribute: "opacity".to_owned(),
                start_data: vec![0.0],
                end_data: vec![opacity],
            }])
        }
        _ => None,
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/service/frame_service.rs"]
mod tests;
