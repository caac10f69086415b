use std::collections::{HashMap, HashSet, VecDeque};

use smallvec::SmallVec;

use crate::foundation::core::{ObjectId, ObjectKey};
use crate::foundation::error::SyncResult;
use crate::scene::graph::SceneGraph;
use crate::sync::registry::IdentityRegistry;
use crate::sync::snapshot::Snapshot;

/// Family snapshots taken when `ancestor` changed while unreachable from the scene root.
#[derive(Clone, Debug)]
struct HierarchyRecord {
    members: Vec<(ObjectId, Snapshot)>,
    committed: bool,
}

/// Result of one [`ReachabilityTracker::check_required`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredOutcome {
    /// Whether the checked object is required after the call.
    pub required: bool,
    /// Ids that became required during the call, in promotion order.
    pub promoted: Vec<ObjectId>,
}

/// Decides which objects the renderer must hear about.
///
/// An object is required once any member of its family is reachable from the scene root. Changes
/// made while an object was still detached are remembered per ancestor, so that attaching the
/// ancestor later promotes every member that was touched in the meantime.
#[derive(Clone, Debug, Default)]
pub struct ReachabilityTracker {
    past_parents: HashMap<ObjectId, SmallVec<[ObjectId; 4]>>,
    records: Vec<HierarchyRecord>,
    record_by_ancestor: HashMap<ObjectId, usize>,
}

impl ReachabilityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ancestors recorded for `id` while they were unreachable.
    pub fn past_parents_of(&self, id: ObjectId) -> &[ObjectId] {
        self.past_parents.get(&id).map_or(&[], |v| v.as_slice())
    }

    /// Number of hierarchy records still holding snapshots.
    pub fn pending_records(&self) -> usize {
        self.records.iter().filter(|r| !r.committed).count()
    }

    /// Decide whether `id` is required given the keys currently reachable from the root.
    ///
    /// Reachable objects get their whole family promoted, along with every member of the pending
    /// hierarchy records of their past parents. Unreachable objects record their current family.
    pub fn check_required(
        &mut self,
        id: ObjectId,
        graph: &SceneGraph,
        registry: &mut IdentityRegistry,
        root_family: &HashSet<ObjectKey>,
    ) -> SyncResult<RequiredOutcome> {
        let key = registry.key_of(id)?;
        let mut promoted = Vec::new();

        if !reaches_root(key, graph, root_family) {
            if registry.is_required(id) {
                return Ok(RequiredOutcome {
                    required: true,
                    promoted,
                });
            }
            self.record(id, key, graph, registry)?;
            return Ok(RequiredOutcome {
                required: false,
                promoted,
            });
        }

        for member in graph.family(key) {
            if let Some(m) = registry.id_of(member)
                && registry.mark_required(m)?
            {
                promoted.push(m);
            }
        }

        let owners: SmallVec<[ObjectId; 4]> = self.past_parents_of(id).into();
        for owner in owners {
            let Some(&slot) = self.record_by_ancestor.get(&owner) else {
                continue;
            };
            let record = &mut self.records[slot];
            if record.committed {
                continue;
            }
            for (member, _) in std::mem::take(&mut record.members) {
                if registry.mark_required(member)? {
                    promoted.push(member);
                }
            }
            record.committed = true;
        }

        if !promoted.is_empty() {
            tracing::debug!(%id, promoted = promoted.len(), "promoted objects to required");
        }
        Ok(RequiredOutcome {
            required: true,
            promoted,
        })
    }

    fn record(
        &mut self,
        id: ObjectId,
        key: ObjectKey,
        graph: &SceneGraph,
        registry: &IdentityRegistry,
    ) -> SyncResult<()> {
        let mut members = Vec::new();
        for member_key in graph.family(key) {
            let Some(m) = registry.id_of(member_key) else {
                continue;
            };
            let parents = self.past_parents.entry(m).or_default();
            if !parents.contains(&id) {
                parents.push(id);
            }
            members.push((m, registry.snapshot_of(m)?.clone()));
        }

        let record = HierarchyRecord {
            members,
            committed: false,
        };
        match self.record_by_ancestor.get(&id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.record_by_ancestor.insert(id, self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }
}

// Breadth-first walk down the submobject edges.
fn reaches_root(start: ObjectKey, graph: &SceneGraph, root_family: &HashSet<ObjectKey>) -> bool {
    let mut queue = VecDeque::from([start]);
    let mut seen = HashSet::new();
    while let Some(k) = queue.pop_front() {
        if !seen.insert(k) {
            continue;
        }
        if root_family.contains(&k) {
            return true;
        }
        if let Some(obj) = graph.get(k) {
            queue.extend(obj.submobjects.iter().copied());
        }
    }
    false
}

#[cfg(test)]
#[path = "../../tests/unit/sync/reachability.rs"]
mod tests;
