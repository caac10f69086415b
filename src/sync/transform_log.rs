use crate::foundation::core::ObjectId;
use crate::scene::object::TransformRecord;
use crate::sync::snapshot::ObjectRef;

/// One entry of the transformation log.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct LoggedTransform {
    /// Absolute position in the log, starting at 0.
    pub index: usize,
    /// Transformed object, or the unknown sentinel.
    pub owner: ObjectRef,
    /// What happened.
    pub record: TransformRecord,
}

/// Append-only log of every transform applied while a scene program ran.
#[derive(Clone, Debug, Default)]
pub struct TransformationLog {
    entries: Vec<LoggedTransform>,
}

impl TransformationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` for `owner`; returns its absolute index.
    pub fn append(&mut self, owner: ObjectRef, record: TransformRecord) -> usize {
        let index = self.entries.len();
        self.entries.push(LoggedTransform {
            index,
            owner,
            record,
        });
        index
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> &[LoggedTransform] {
        &self.entries
    }

    /// Entries owned by `id`, oldest first.
    pub fn for_owner(&self, id: ObjectId) -> impl Iterator<Item = &LoggedTransform> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.owner == ObjectRef::Known(id))
    }

    /// Entries with an absolute index of at least `index`.
    pub fn since(&self, index: usize) -> &[LoggedTransform] {
        self.entries.get(index..).unwrap_or(&[])
    }
}
