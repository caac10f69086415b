use std::collections::HashSet;

use crate::foundation::core::{ObjectId, ObjectKey};
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::graph::SceneGraph;
use crate::scene::object::TransformRecord;
use crate::sync::diff::{Diff, diff_presence, diff_snapshots};
use crate::sync::reachability::{ReachabilityTracker, RequiredOutcome};
use crate::sync::registry::IdentityRegistry;
use crate::sync::snapshot::{CaptureOpts, ResolveIds, capture};
use crate::sync::transform_log::TransformationLog;

/// Outcome of observing one object.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Id of the observed object.
    pub id: ObjectId,
    /// Diff against the previous baseline.
    pub diff: Diff,
    /// Reachability decision; default (not required, nothing promoted) when the diff was empty.
    pub required: RequiredOutcome,
}

/// Per-generation synchronization state: identities, transform log and reachability.
///
/// One context exists per loaded scene program. It is built while the program runs and then
/// owned by the serving session, which serializes every access to it.
#[derive(Clone, Debug)]
pub struct SyncContext {
    /// Identity registry and baselines.
    pub registry: IdentityRegistry,
    /// Transformation log.
    pub transforms: TransformationLog,
    /// Reachability tracker.
    pub reach: ReachabilityTracker,
    opts: CaptureOpts,
    copy_tag: String,
}

impl SyncContext {
    /// Create an empty context.
    pub fn new(opts: CaptureOpts, copy_tag: impl Into<String>) -> Self {
        Self {
            registry: IdentityRegistry::new(),
            transforms: TransformationLog::new(),
            reach: ReachabilityTracker::new(),
            opts,
            copy_tag: copy_tag.into(),
        }
    }

    /// Capture options used for every snapshot of this context.
    pub fn capture_opts(&self) -> &CaptureOpts {
        &self.opts
    }

    /// Register `key` and its family against the current state of `graph`.
    pub fn register(&mut self, key: ObjectKey, graph: &SceneGraph) -> SyncResult<ObjectId> {
        let roots = root_family_set(graph);
        let added = roots.contains(&key);
        self.registry
            .register_family(key, graph, &self.copy_tag, added, &self.opts)
            .ok_or_else(|| {
                SyncError::validation(format!("object key {} is not in the scene", key.0))
            })
    }

    /// Append a transform of `key` to the log, resolving its owner through the registry.
    pub fn log_transform(&mut self, key: ObjectKey, record: TransformRecord) -> usize {
        let owner = self.registry.resolve(key);
        self.transforms.append(owner, record)
    }

    /// Capture `key`, diff it against its baseline and, when something changed, store the new
    /// baseline and re-run the reachability check.
    ///
    /// Unregistered objects are registered on the spot and reported as a presence change.
    pub fn observe(
        &mut self,
        key: ObjectKey,
        graph: &SceneGraph,
        root_family: &HashSet<ObjectKey>,
    ) -> SyncResult<Observation> {
        let object = graph.get(key).ok_or_else(|| {
            SyncError::validation(format!("object key {} is not in the scene", key.0))
        })?;
        let added = root_family.contains(&key);

        let (id, diff) = match self.registry.id_of(key) {
            Some(id) => {
                let snapshot = capture(object, graph, &self.registry, added, &self.opts);
                let diff = diff_snapshots(self.registry.snapshot_of(id)?, &snapshot);
                if !diff.is_empty() {
                    self.registry.set_baseline(id, snapshot)?;
                }
                (id, diff)
            }
            None => {
                let id = self
                    .registry
                    .register(object, graph, &self.copy_tag, added, &self.opts);
                let diff = diff_presence(None, Some(self.registry.snapshot_of(id)?));
                (id, diff)
            }
        };

        let required = if diff.is_empty() {
            RequiredOutcome {
                required: self.registry.is_required(id),
                promoted: Vec::new(),
            }
        } else {
            self.reach
                .check_required(id, graph, &mut self.registry, root_family)?
        };
        Ok(Observation { id, diff, required })
    }
}

/// Keys of every object reachable from the roots of `graph`.
pub fn root_family_set(graph: &SceneGraph) -> HashSet<ObjectKey> {
    graph.root_family().into_iter().collect()
}
