use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::{ObjectKey, Rgba, Vec3};
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::animation::Animation;
use crate::scene::graph::SceneGraph;
use crate::scene::object::{SceneObject, TransformRecord};
use crate::sync::context::{SyncContext, root_family_set};
use crate::sync::snapshot::CaptureOpts;
use crate::timeline::store::TimelineStore;

/// Options applied while a scene program runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneOpts {
    /// Snapshot capture options.
    pub capture: CaptureOpts,
    /// Tag used when naming copies.
    pub copy_tag: String,
}

impl Default for SceneOpts {
    fn default() -> Self {
        Self {
            capture: CaptureOpts::default(),
            copy_tag: "c".to_owned(),
        }
    }
}

/// Everything one run of a scene program produced.
#[derive(Clone, Debug)]
pub struct RecordedScene {
    /// Scene name.
    pub name: String,
    /// Background color, if the program set one.
    pub background_color: Option<Rgba>,
    /// Recorded segments.
    pub timeline: TimelineStore,
    /// Identities, transform log and reachability built during the run.
    pub ctx: SyncContext,
}

/// Records a scene program: creates objects, plays animations and captures keyframes.
///
/// Every mutation goes through the sync context, so the registry, transformation log and
/// reachability state describe the run once [`SceneBuilder::finish`] is called.
#[derive(Debug)]
pub struct SceneBuilder {
    name: String,
    background: Option<Rgba>,
    graph: SceneGraph,
    timeline: TimelineStore,
    ctx: SyncContext,
}

impl SceneBuilder {
    /// Start recording a scene called `name`.
    pub fn new(name: impl Into<String>, opts: &SceneOpts) -> Self {
        Self {
            name: name.into(),
            background: None,
            graph: SceneGraph::new(),
            timeline: TimelineStore::new(),
            ctx: SyncContext::new(opts.capture.clone(), opts.copy_tag.clone()),
        }
    }

    /// Rename the scene.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the background color reported to renderers.
    pub fn set_background(&mut self, color: Rgba) {
        self.background = Some(color);
    }

    /// Live scene graph.
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Sync context built so far.
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    fn require(&self, key: ObjectKey) -> SyncResult<()> {
        if self.graph.contains(key) {
            Ok(())
        } else {
            Err(SyncError::validation(format!(
                "object key {} does not exist",
                key.0
            )))
        }
    }

    /// Insert `object` and register it. Its submobjects must already exist.
    pub fn create(&mut self, object: SceneObject) -> SyncResult<ObjectKey> {
        for &child in &object.submobjects {
            self.require(child)?;
        }
        let key = self.graph.insert(object);
        self.ctx.register(key, &self.graph)?;
        Ok(key)
    }

    /// Move `key`'s center to `point` as part of its construction.
    ///
    /// Unlike [`SceneBuilder::shift`] this is not a transform: nothing is logged and the baselines
    /// are simply refreshed.
    pub fn place(&mut self, key: ObjectKey, point: Vec3) -> SyncResult<()> {
        self.require(key)?;
        let delta = point - self.graph.center(key);
        self.graph.shift(key, delta);
        self.ctx.register(key, &self.graph)?;
        Ok(())
    }

    /// Deep-copy `key`'s family; the copies are named after their originals.
    pub fn copy(&mut self, key: ObjectKey) -> SyncResult<ObjectKey> {
        self.require(key)?;
        let copy = self
            .graph
            .duplicate(key)
            .ok_or_else(|| SyncError::validation(format!("object key {} vanished", key.0)))?;
        self.ctx.register(copy, &self.graph)?;
        Ok(copy)
    }

    /// Attach `key` to the scene.
    pub fn add(&mut self, key: ObjectKey) -> SyncResult<()> {
        self.require(key)?;
        self.graph.add_root(key);
        self.observe_family(key)
    }

    /// Detach `key` from the scene.
    pub fn remove(&mut self, key: ObjectKey) -> SyncResult<()> {
        self.require(key)?;
        self.graph.remove_root(key);
        self.observe_family(key)
    }

    /// Append `child` to `parent`'s submobjects.
    pub fn add_submobject(&mut self, parent: ObjectKey, child: ObjectKey) -> SyncResult<()> {
        self.require(child)?;
        if parent == child || self.graph.family(child).contains(&parent) {
            return Err(SyncError::validation(format!(
                "attaching {} under {} would create a cycle",
                child.0, parent.0
            )));
        }
        let Some(obj) = self.graph.get_mut(parent) else {
            return Err(SyncError::validation(format!(
                "object key {} does not exist",
                parent.0
            )));
        };
        if !obj.submobjects.contains(&child) {
            obj.submobjects.push(child);
        }
        self.observe_family(child)?;
        self.observe_family(parent)
    }

    /// Translate `key` immediately.
    pub fn shift(&mut self, key: ObjectKey, vector: Vec3) -> SyncResult<()> {
        self.require(key)?;
        self.graph.shift(key, vector);
        self.record_transform(key, TransformRecord::Shift { vector })
    }

    /// Rotate `key` immediately.
    pub fn rotate(&mut self, key: ObjectKey, angle: f64, axis: Vec3) -> SyncResult<()> {
        self.require(key)?;
        self.graph.rotate(key, angle, axis);
        self.record_transform(key, TransformRecord::Rotate { angle, axis })
    }

    /// Scale `key` immediately.
    pub fn scale(&mut self, key: ObjectKey, factor: f64) -> SyncResult<()> {
        self.require(key)?;
        self.graph.scale(key, factor);
        self.record_transform(key, TransformRecord::Scale { factor })
    }

    /// Record one segment playing `animations` together, then apply their end state.
    ///
    /// Introducing animations attach their target before the keyframe is taken; removing ones
    /// detach it once finished. The segment lasts as long as its longest animation.
    #[tracing::instrument(level = "debug", skip_all, fields(count = animations.len()))]
    pub fn play(&mut self, mut animations: Vec<Animation>) -> SyncResult<()> {
        if animations.is_empty() {
            return Err(SyncError::validation("play needs at least one animation"));
        }
        for anim in &animations {
            if let Some(target) = anim.target {
                self.require(target)?;
            }
            if anim.run_time.is_nan() || anim.run_time < 0.0 {
                return Err(SyncError::validation(format!(
                    "{} has invalid run time {}",
                    anim.class_name(),
                    anim.run_time
                )));
            }
        }

        for anim in animations.iter().filter(|a| a.is_introducer()) {
            if let Some(target) = anim.target {
                self.graph.add_root(target);
            }
        }

        let duration = animations
            .iter()
            .map(|a| a.run_time)
            .fold(0.0_f64, f64::max);
        let start = self.graph.clone();

        for anim in &mut animations {
            anim.resolve(&self.graph);
            if let Some((key, record)) = anim.finish(&mut self.graph) {
                self.push_transform(key, record);
            }
        }
        self.timeline.record_segment(start, animations.clone(), duration);

        for anim in &animations {
            if let Some(target) = anim.target {
                self.observe_family(target)?;
            }
        }
        Ok(())
    }

    /// Hold the scene still for `seconds`.
    pub fn wait(&mut self, seconds: f64) -> SyncResult<()> {
        self.play(vec![Animation::wait(seconds)])
    }

    /// Stop recording.
    pub fn finish(self) -> RecordedScene {
        tracing::debug!(
            scene = %self.name,
            segments = self.timeline.len(),
            objects = self.ctx.registry.len(),
            "scene recorded"
        );
        RecordedScene {
            name: self.name,
            background_color: self.background,
            timeline: self.timeline,
            ctx: self.ctx,
        }
    }

    fn push_transform(&mut self, key: ObjectKey, record: TransformRecord) {
        if let Some(obj) = self.graph.get_mut(key) {
            obj.transformations.push(record);
        }
        self.ctx.log_transform(key, record);
    }

    fn record_transform(&mut self, key: ObjectKey, record: TransformRecord) -> SyncResult<()> {
        self.push_transform(key, record);
        self.observe_family(key)
    }

    fn observe_family(&mut self, key: ObjectKey) -> SyncResult<()> {
        let roots = root_family_set(&self.graph);
        for member in self.graph.family(key) {
            self.ctx.observe(member, &self.graph, &roots)?;
        }
        Ok(())
    }
}

/// A re-executable scene program.
pub trait SceneSource: Send + Sync {
    /// File whose directory should be watched for edits, if any.
    fn watch_path(&self) -> Option<&Path>;

    /// Run the program from scratch.
    fn load(&self, opts: &SceneOpts) -> SyncResult<RecordedScene>;
}

type Program = dyn Fn(&mut SceneBuilder) -> anyhow::Result<()> + Send + Sync;

/// Scene program written as a Rust closure.
#[derive(Clone)]
pub struct ProgramSource {
    name: String,
    watch: Option<PathBuf>,
    program: Arc<Program>,
}

impl ProgramSource {
    /// Wrap `program` as a scene called `name`.
    pub fn new(
        name: impl Into<String>,
        program: impl Fn(&mut SceneBuilder) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            watch: None,
            program: Arc::new(program),
        }
    }

    /// Watch `path` for edits.
    pub fn watching(mut self, path: impl Into<PathBuf>) -> Self {
        self.watch = Some(path.into());
        self
    }
}

impl std::fmt::Debug for ProgramSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramSource")
            .field("name", &self.name)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl SceneSource for ProgramSource {
    fn watch_path(&self) -> Option<&Path> {
        self.watch.as_deref()
    }

    fn load(&self, opts: &SceneOpts) -> SyncResult<RecordedScene> {
        let mut builder = SceneBuilder::new(self.name.clone(), opts);
        (self.program)(&mut builder)
            .map_err(|e| SyncError::load(self.name.clone(), e))?;
        Ok(builder.finish())
    }
}
