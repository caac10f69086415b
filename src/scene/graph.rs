use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::foundation::core::{ObjectKey, Vec3};
use crate::scene::object::SceneObject;

/// Copy-on-write arena holding every object a scene program created, attached or not.
///
/// Cloning a graph is O(1): the object table and each object live behind `Arc`s and are only
/// duplicated when a clone mutates them, so a keyframe copy is independently mutable without
/// paying for a deep copy up front.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    objects: Arc<BTreeMap<ObjectKey, Arc<SceneObject>>>,
    roots: Vec<ObjectKey>,
    next_key: u64,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `obj`, assigning it a fresh key.
    pub fn insert(&mut self, mut obj: SceneObject) -> ObjectKey {
        self.next_key += 1;
        let key = ObjectKey(self.next_key);
        obj.key = key;
        Arc::make_mut(&mut self.objects).insert(key, Arc::new(obj));
        key
    }

    /// Look up an object.
    pub fn get(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(&key).map(Arc::as_ref)
    }

    /// Mutable access to one object, detaching it from any graph sharing its storage.
    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        if !self.objects.contains_key(&key) {
            return None;
        }
        Arc::make_mut(&mut self.objects)
            .get_mut(&key)
            .map(Arc::make_mut)
    }

    /// Overwrite the stored state of an existing object.
    pub fn replace(&mut self, obj: SceneObject) {
        if let Some(slot) = self.get_mut(obj.key) {
            *slot = obj;
        }
    }

    /// Return `true` if `key` names an object of this graph.
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(&key)
    }

    /// Every key in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.objects.keys().copied()
    }

    /// Number of objects, attached or not.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Return `true` when no object was ever inserted.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Top-level objects currently part of the scene, in paint order.
    pub fn roots(&self) -> &[ObjectKey] {
        &self.roots
    }

    /// Attach `key` at the top of the paint order, moving it if already attached.
    pub fn add_root(&mut self, key: ObjectKey) {
        self.roots.retain(|k| *k != key);
        self.roots.push(key);
    }

    /// Detach `key` from the root list.
    pub fn remove_root(&mut self, key: ObjectKey) {
        self.roots.retain(|k| *k != key);
    }

    /// `key` followed by its transitive submobjects, pre-order, each key once.
    pub fn family(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_family(key, &mut seen, &mut out);
        out
    }

    /// Families of every root, concatenated in paint order, each key once.
    pub fn root_family(&self) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for &root in &self.roots {
            self.collect_family(root, &mut seen, &mut out);
        }
        out
    }

    fn collect_family(
        &self,
        key: ObjectKey,
        seen: &mut HashSet<ObjectKey>,
        out: &mut Vec<ObjectKey>,
    ) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            let Some(obj) = self.get(k) else {
                continue;
            };
            if !seen.insert(k) {
                continue;
            }
            out.push(k);
            for &child in obj.submobjects.iter().rev() {
                stack.push(child);
            }
        }
    }

    /// Center of the bounding box of every point in `key`'s family.
    pub fn center(&self, key: ObjectKey) -> Vec3 {
        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut any = false;
        for k in self.family(key) {
            let Some(obj) = self.get(k) else {
                continue;
            };
            for p in obj.bounding_points() {
                any = true;
                min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
            }
        }
        if !any {
            return Vec3::ZERO;
        }
        (min + max) * 0.5
    }

    /// Translate `key`'s whole family.
    pub fn shift(&mut self, key: ObjectKey, vector: Vec3) {
        for k in self.family(key) {
            if let Some(obj) = self.get_mut(k) {
                obj.map_points(|p| p + vector);
            }
        }
    }

    /// Rotate `key`'s whole family about its center.
    pub fn rotate(&mut self, key: ObjectKey, angle: f64, axis: Vec3) {
        let about = self.center(key);
        for k in self.family(key) {
            if let Some(obj) = self.get_mut(k) {
                obj.map_points(|p| about + (p - about).rotated(angle, axis));
            }
        }
    }

    /// Scale `key`'s whole family about its center.
    pub fn scale(&mut self, key: ObjectKey, factor: f64) {
        let about = self.center(key);
        for k in self.family(key) {
            if let Some(obj) = self.get_mut(k) {
                obj.scale_about(factor, about);
            }
        }
    }

    /// Deep-copy `key`'s family under fresh keys, marking each copy with its original.
    ///
    /// Returns the key of the copied family root, or `None` if `key` is unknown.
    pub fn duplicate(&mut self, key: ObjectKey) -> Option<ObjectKey> {
        let src = self.get(key)?.clone();
        let children: Vec<ObjectKey> = src
            .submobjects
            .iter()
            .filter_map(|&c| self.duplicate(c))
            .collect();
        let mut copy = src;
        copy.original = Some(key);
        copy.submobjects = children;
        Some(self.insert(copy))
    }

    /// Return `true` if both graphs still share the same object table.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.objects, &other.objects)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
