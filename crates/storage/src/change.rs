//! Record change notifications.
//!
//! A `RecordChange` describes one mutation of a store and carries the record
//! snapshots from before and after it.

use std::rc::Rc;
use quiver_core::{Record, RecordId};

/// Kind of mutation applied to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single mutation of a record store.
#[derive(Clone, Debug)]
pub enum RecordChange {
    /// A record was inserted.
    Insert { record: Rc<Record> },
    /// A record was updated.
    Update { old: Rc<Record>, new: Rc<Record> },
    /// A record was deleted.
    Delete { record: Rc<Record> },
}

impl RecordChange {
    /// Returns the kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            RecordChange::Insert { .. } => ChangeKind::Insert,
            RecordChange::Update { .. } => ChangeKind::Update,
            RecordChange::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Returns the identity of the changed record.
    pub fn id(&self) -> RecordId {
        match self {
            RecordChange::Insert { record } => record.id(),
            RecordChange::Update { new, .. } => new.id(),
            RecordChange::Delete { record } => record.id(),
        }
    }

    /// Returns the snapshot before the change, if the record existed.
    pub fn old(&self) -> Option<&Rc<Record>> {
        match self {
            RecordChange::Insert { .. } => None,
            RecordChange::Update { old, .. } => Some(old),
            RecordChange::Delete { record } => Some(record),
        }
    }

    /// Returns the snapshot after the change, if the record still exists.
    pub fn new_record(&self) -> Option<&Rc<Record>> {
        match self {
            RecordChange::Insert { record } => Some(record),
            RecordChange::Update { new, .. } => Some(new),
            RecordChange::Delete { .. } => None,
        }
    }
}
