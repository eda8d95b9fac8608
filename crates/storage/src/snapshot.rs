//! Snapshot document written to a store's medium on checkpoint.
//!
//! The document is JSON:
//!
//! ```text
//! { "format": 1, "entity": "Task", "next_id": 12, "records": [ { "id": 3, "version": 2, "fields": { ... } } ] }
//! ```
//!
//! `next_id` is stored explicitly so that identities of deleted records are
//! never issued again after reopening.

use quiver_core::{Error, Record, RecordId, Result};
use serde::{Deserialize, Serialize};

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Serialized state of one store.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: u32,
    pub entity: String,
    pub next_id: RecordId,
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Encodes the snapshot as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| Error::persistence(format!("failed to encode snapshot: {}", err)))
    }

    /// Decodes and validates a snapshot for the given entity.
    pub fn decode(bytes: &[u8], entity: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|err| Error::persistence(format!("corrupt snapshot: {}", err)))?;
        snapshot.validate(entity)?;
        Ok(snapshot)
    }

    fn validate(&self, entity: &str) -> Result<()> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(Error::persistence(format!(
                "unsupported snapshot format {}",
                self.format
            )));
        }
        if self.entity != entity {
            return Err(Error::persistence(format!(
                "snapshot holds entity `{}`, expected `{}`",
                self.entity, entity
            )));
        }
        let mut seen = hashbrown::HashSet::with_capacity(self.records.len());
        for record in &self.records {
            if record.id() >= self.next_id {
                return Err(Error::persistence(format!(
                    "record {} is not below next_id {}",
                    record.id(),
                    self.next_id
                )));
            }
            if !seen.insert(record.id()) {
                return Err(Error::persistence(format!(
                    "duplicate record {} in snapshot",
                    record.id()
                )));
            }
        }
        Ok(())
    }
}
