use std::collections::HashMap;

use crate::foundation::core::{ObjectId, ObjectKey};
use crate::foundation::error::{SyncError, SyncResult};
use crate::scene::graph::SceneGraph;
use crate::scene::object::SceneObject;
use crate::sync::snapshot::{CaptureOpts, ObjectRef, ResolveIds, Snapshot, capture};

#[derive(Clone, Debug)]
struct Entry {
    key: ObjectKey,
    name: String,
    baseline: Snapshot,
    required: bool,
}

/// Monotonic name counters.
///
/// Plain objects are named `<ClassName><n>` with one counter per class; copies are named
/// `<original-name>#<tag><n>` with one counter per (original, tag) pair. Counters start at 1 and
/// never go back.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    per_class: HashMap<String, u32>,
    per_copy: HashMap<(ObjectId, String), u32>,
}

impl NameTable {
    /// Next name for a fresh object of `class_name`.
    pub fn class_name(&mut self, class_name: &str) -> String {
        let n = self.per_class.entry(class_name.to_owned()).or_insert(0);
        *n += 1;
        format!("{class_name}{n}")
    }

    /// Next name for a copy of `original` named `original_name`, tagged `tag`.
    pub fn copy_name(&mut self, original: ObjectId, original_name: &str, tag: &str) -> String {
        let n = self.per_copy.entry((original, tag.to_owned())).or_insert(0);
        *n += 1;
        format!("{original_name}#{tag}{n}")
    }
}

/// Stable identity, naming and baseline storage for scene objects.
///
/// Ids are handed out in registration order and never reused. Each entry keeps the last snapshot
/// the object was diffed against (its baseline) and the monotonic `required` flag.
#[derive(Clone, Debug, Default)]
pub struct IdentityRegistry {
    by_key: HashMap<ObjectKey, ObjectId>,
    entries: Vec<Entry>,
    names: NameTable,
}

impl IdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing was registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `object`, or refresh its baseline when it is already known.
    ///
    /// The first registration names the object: copies (objects with an `original` that is itself
    /// registered) get `<original-name>#<copy_tag><n>`, everything else `<ClassName><n>`.
    pub fn register(
        &mut self,
        object: &SceneObject,
        graph: &SceneGraph,
        copy_tag: &str,
        added: bool,
        opts: &CaptureOpts,
    ) -> ObjectId {
        let snapshot = capture(object, graph, self, added, opts);
        if let Some(&id) = self.by_key.get(&object.key) {
            if let Some(entry) = self.entries.get_mut(id.0 as usize) {
                let required = entry.required;
                entry.baseline = snapshot;
                entry.baseline.set_required(required);
            }
            return id;
        }

        let original = object
            .original
            .and_then(|k| self.by_key.get(&k).copied())
            .and_then(|id| Some((id, self.name_of(id).ok()?.to_owned())));
        let name = match original {
            Some((orig_id, orig_name)) => self.names.copy_name(orig_id, &orig_name, copy_tag),
            None => self.names.class_name(&object.class_name),
        };

        let id = ObjectId(self.entries.len() as u32);
        tracing::trace!(%id, %name, "registered object");
        self.by_key.insert(object.key, id);
        self.entries.push(Entry {
            key: object.key,
            name,
            baseline: snapshot,
            required: false,
        });
        id
    }

    /// Register `root` and its whole family, children before parents, so parent snapshots
    /// resolve their children's ids.
    pub fn register_family(
        &mut self,
        root: ObjectKey,
        graph: &SceneGraph,
        copy_tag: &str,
        added: bool,
        opts: &CaptureOpts,
    ) -> Option<ObjectId> {
        let family = graph.family(root);
        for &key in family.iter().rev() {
            if let Some(obj) = graph.get(key) {
                self.register(obj, graph, copy_tag, added, opts);
            }
        }
        self.id_of(root)
    }

    fn entry(&self, id: ObjectId) -> SyncResult<&Entry> {
        self.entries
            .get(id.0 as usize)
            .ok_or(SyncError::NotFound(id))
    }

    fn entry_mut(&mut self, id: ObjectId) -> SyncResult<&mut Entry> {
        self.entries
            .get_mut(id.0 as usize)
            .ok_or(SyncError::NotFound(id))
    }

    /// Baseline snapshot of `id`.
    pub fn snapshot_of(&self, id: ObjectId) -> SyncResult<&Snapshot> {
        Ok(&self.entry(id)?.baseline)
    }

    /// Id registered for `key`, if any.
    pub fn id_of(&self, key: ObjectKey) -> Option<ObjectId> {
        self.by_key.get(&key).copied()
    }

    /// Graph key registered under `id`.
    pub fn key_of(&self, id: ObjectId) -> SyncResult<ObjectKey> {
        Ok(self.entry(id)?.key)
    }

    /// Human-readable name of `id`.
    pub fn name_of(&self, id: ObjectId) -> SyncResult<&str> {
        Ok(&self.entry(id)?.name)
    }

    /// Replace the baseline of `id`, keeping its `required` flag.
    pub fn set_baseline(&mut self, id: ObjectId, mut snapshot: Snapshot) -> SyncResult<()> {
        let entry = self.entry_mut(id)?;
        snapshot.set_required(entry.required);
        entry.baseline = snapshot;
        Ok(())
    }

    /// Mark `id` required. Returns `true` if it was not required before.
    pub fn mark_required(&mut self, id: ObjectId) -> SyncResult<bool> {
        let entry = self.entry_mut(id)?;
        if entry.required {
            return Ok(false);
        }
        entry.required = true;
        entry.baseline.set_required(true);
        Ok(true)
    }

    /// Whether `id` is required. Unknown ids are not.
    pub fn is_required(&self, id: ObjectId) -> bool {
        self.entry(id).is_ok_and(|e| e.required)
    }

    /// Every registered id, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        (0..self.entries.len()).map(|i| ObjectId(i as u32))
    }
}

impl ResolveIds for IdentityRegistry {
    fn resolve(&self, key: ObjectKey) -> ObjectRef {
        match self.id_of(key) {
            Some(id) => ObjectRef::Known(id),
            None => ObjectRef::Unknown,
        }
    }

    fn is_required_key(&self, key: ObjectKey) -> bool {
        self.id_of(key).is_some_and(|id| self.is_required(id))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/registry.rs"]
mod tests;
