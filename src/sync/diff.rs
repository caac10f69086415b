//! Field-level diffs between snapshots, and added/removed diffs between id generations.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::foundation::core::{ObjectId, POSITION_TOLERANCE};
use crate::sync::snapshot::{Snapshot, Value, field};

/// Old and new value of one differing field.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FieldDelta {
    /// Value in the older snapshot, [`Value::None`] if absent.
    pub old: Value,
    /// Value in the newer snapshot, [`Value::None`] if absent.
    pub new: Value,
}

/// Result of comparing two snapshots of the same object.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diff {
    /// The object became part of the scene.
    Added,
    /// The object left the scene.
    Removed,
    /// Differing fields; empty when nothing changed.
    Changed(BTreeMap<String, FieldDelta>),
}

impl Diff {
    /// Return `true` for an empty [`Diff::Changed`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Changed(m) if m.is_empty())
    }

    /// Changed fields, if any.
    pub fn fields(&self) -> Option<&BTreeMap<String, FieldDelta>> {
        match self {
            Self::Changed(m) => Some(m),
            _ => None,
        }
    }
}

/// Compare two snapshots of one object.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> Diff {
    match (old.is_added(), new.is_added()) {
        (false, true) => return Diff::Added,
        (true, false) => return Diff::Removed,
        _ => {}
    }

    let names: BTreeSet<&str> = old
        .fields
        .keys()
        .chain(new.fields.keys())
        .map(String::as_str)
        .collect();

    let mut out = BTreeMap::new();
    for name in names {
        if name == field::REQUIRED || name == field::ADDED {
            continue;
        }
        let delta = match (old.get(name), new.get(name)) {
            (Some(a), Some(b)) => diff_field(name, a, b),
            (Some(a), None) => Some(FieldDelta {
                old: a.clone(),
                new: Value::None,
            }),
            (None, Some(b)) => Some(FieldDelta {
                old: Value::None,
                new: b.clone(),
            }),
            (None, None) => None,
        };
        if let Some(delta) = delta {
            out.insert(name.to_owned(), delta);
        }
    }
    Diff::Changed(out)
}

/// Diff with absent snapshots: appearing gives `Added`, disappearing gives `Removed`.
pub fn diff_presence(old: Option<&Snapshot>, new: Option<&Snapshot>) -> Diff {
    match (old, new) {
        (Some(a), Some(b)) => diff_snapshots(a, b),
        (None, Some(_)) => Diff::Added,
        (Some(_), None) => Diff::Removed,
        (None, None) => Diff::Changed(BTreeMap::new()),
    }
}

fn diff_field(name: &str, a: &Value, b: &Value) -> Option<FieldDelta> {
    let equal = match (name, a, b) {
        (field::SUBMOBJECTS, Value::Ids(x), Value::Ids(y)) => {
            x.iter().collect::<BTreeSet<_>>() == y.iter().collect::<BTreeSet<_>>()
        }
        (field::POSITION, Value::Vector(x), Value::Vector(y)) => {
            x.approx_eq(*y, POSITION_TOLERANCE)
        }
        (field::TRANSFORMATIONS, Value::Transforms(x), Value::Transforms(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| p.kind_eq(q))
        }
        (field::STYLE | field::CONFIG, Value::Map(x), Value::Map(y)) => {
            return diff_maps(x, y);
        }
        _ => a == b,
    };
    (!equal).then(|| FieldDelta {
        old: a.clone(),
        new: b.clone(),
    })
}

// Reports only the sub-fields that differ.
fn diff_maps(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> Option<FieldDelta> {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let mut old = BTreeMap::new();
    let mut new = BTreeMap::new();
    for k in keys {
        let x = a.get(k).unwrap_or(&Value::None);
        let y = b.get(k).unwrap_or(&Value::None);
        if x != y {
            old.insert(k.clone(), x.clone());
            new.insert(k.clone(), y.clone());
        }
    }
    if old.is_empty() {
        return None;
    }
    Some(FieldDelta {
        old: Value::Map(old),
        new: Value::Map(new),
    })
}

/// Ids that appeared and disappeared between two generations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdSetDiff {
    /// In `new` but not `old`, in `new` order.
    pub added: Vec<ObjectId>,
    /// In `old` but not `new`, in `old` order.
    pub removed: Vec<ObjectId>,
}

/// Order-preserving set difference of two id generations.
pub fn diff_id_sets(old: &[ObjectId], new: &[ObjectId]) -> IdSetDiff {
    let old_set: HashSet<ObjectId> = old.iter().copied().collect();
    let new_set: HashSet<ObjectId> = new.iter().copied().collect();
    let mut seen = HashSet::new();
    let added = new
        .iter()
        .copied()
        .filter(|id| !old_set.contains(id) && seen.insert(*id))
        .collect();
    seen.clear();
    let removed = old
        .iter()
        .copied()
        .filter(|id| !new_set.contains(id) && seen.insert(*id))
        .collect();
    IdSetDiff { added, removed }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/diff.rs"]
mod tests;
