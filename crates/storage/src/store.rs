//! Record storage for Quiver.
//!
//! This module provides the `RecordStore` struct which owns every record of a
//! single entity kind, issues identities, notifies attached observers of each
//! mutation and checkpoints its state to a backing medium.

use crate::change::RecordChange;
use crate::config::StoreConfig;
use crate::medium::Medium;
use crate::observer::{ObserverId, ObserverRegistry, SharedObserver};
use crate::snapshot::{Snapshot, SNAPSHOT_FORMAT};
use quiver_core::{Error, Fields, Record, RecordId, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Record storage backend: HashMap (O(1) lookup) or BTreeMap (O(log n) lookup).
#[cfg(feature = "hash-store")]
type RecordMap = hashbrown::HashMap<RecordId, Rc<Record>>;
#[cfg(not(feature = "hash-store"))]
type RecordMap = BTreeMap<RecordId, Rc<Record>>;

/// Owns the records of one entity kind.
pub struct RecordStore {
    entity: String,
    records: RecordMap,
    /// Next identity to issue. Never decreases.
    next_id: RecordId,
    /// True when there are mutations since the last checkpoint.
    dirty: bool,
    medium: Box<dyn Medium>,
    auto_checkpoint: bool,
    observers: ObserverRegistry,
}

impl RecordStore {
    /// Creates an empty store. Anything already on the medium is ignored and
    /// will be replaced by the first checkpoint.
    pub fn new(config: StoreConfig) -> Self {
        let (entity, medium, auto_checkpoint) = config.into_parts();
        Self {
            entity,
            records: RecordMap::default(),
            next_id: 1,
            dirty: false,
            medium,
            auto_checkpoint,
            observers: ObserverRegistry::new(),
        }
    }

    /// Opens a store, restoring the last checkpoint from the medium if there
    /// is one.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(config);
        let Some(bytes) = store.medium.load().map_err(|err| store.log_persistence(err))? else {
            debug!(entity = %store.entity, medium = %store.medium.describe(), "opened empty store");
            return Ok(store);
        };
        let snapshot =
            Snapshot::decode(&bytes, &store.entity).map_err(|err| store.log_persistence(err))?;
        store.next_id = snapshot.next_id;
        for record in snapshot.records {
            store.records.insert(record.id(), Rc::new(record));
        }
        debug!(
            entity = %store.entity,
            records = store.records.len(),
            next_id = store.next_id,
            "restored store from checkpoint"
        );
        Ok(store)
    }

    /// Returns the entity name.
    #[inline]
    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true when there are mutations since the last checkpoint.
    #[inline]
    pub fn has_changes(&self) -> bool {
        self.dirty
    }

    /// Returns whether controllers should checkpoint after every mutation.
    #[inline]
    pub fn auto_checkpoint(&self) -> bool {
        self.auto_checkpoint
    }

    /// Gets a record snapshot by identity.
    pub fn get(&self, id: RecordId) -> Option<Rc<Record>> {
        self.records.get(&id).cloned()
    }

    /// Returns true if a record with this identity exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Iterates over all records.
    pub fn records(&self) -> impl Iterator<Item = &Rc<Record>> {
        self.records.values()
    }

    /// Returns all identities.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }

    /// Inserts a new record and returns its identity.
    pub fn insert(&mut self, fields: Fields) -> Result<RecordId> {
        self.observers.ensure_idle()?;

        let id = self.next_id;
        self.next_id += 1;
        let record = Rc::new(Record::new(id, fields));
        self.records.insert(id, Rc::clone(&record));
        self.dirty = true;
        debug!(entity = %self.entity, id, "record inserted");

        self.notify(&RecordChange::Insert { record })?;
        Ok(id)
    }

    /// Mutates the fields of an existing record in place and bumps its
    /// version. The identity cannot be changed.
    pub fn update<F>(&mut self, id: RecordId, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Fields),
    {
        self.observers.ensure_idle()?;

        let slot = self
            .records
            .get_mut(&id)
            .ok_or_else(|| Error::contract_violation(format!("update of unknown record {}", id)))?;
        let old = Rc::clone(slot);
        let record = Rc::make_mut(slot);
        mutator(record.fields_mut());
        record.increment_version();
        let new = Rc::clone(slot);
        self.dirty = true;
        debug!(entity = %self.entity, id, version = new.version(), "record updated");

        self.notify(&RecordChange::Update { old, new })
    }

    /// Deletes a record and returns its last snapshot.
    pub fn delete(&mut self, id: RecordId) -> Result<Rc<Record>> {
        self.observers.ensure_idle()?;

        let record = self
            .records
            .remove(&id)
            .ok_or_else(|| Error::contract_violation(format!("delete of unknown record {}", id)))?;
        self.dirty = true;
        debug!(entity = %self.entity, id, "record deleted");

        self.notify(&RecordChange::Delete {
            record: Rc::clone(&record),
        })?;
        Ok(record)
    }

    /// Writes a full snapshot to the medium.
    ///
    /// Does nothing when there are no changes since the last checkpoint. On
    /// failure the store stays dirty so a later checkpoint retries.
    pub fn checkpoint(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let snapshot = Snapshot {
            format: SNAPSHOT_FORMAT,
            entity: self.entity.clone(),
            next_id: self.next_id,
            records: self.sorted_records(),
        };
        let bytes = snapshot.encode().map_err(|err| self.log_persistence(err))?;
        self.medium
            .store(&bytes)
            .map_err(|err| self.log_persistence(err))?;
        self.dirty = false;
        debug!(
            entity = %self.entity,
            medium = %self.medium.describe(),
            records = snapshot.records.len(),
            "checkpoint written"
        );
        Ok(())
    }

    /// Registers an observer. It is notified of every later mutation.
    pub fn attach(&mut self, observer: &SharedObserver) -> Result<ObserverId> {
        {
            let guard = observer.try_borrow().map_err(|_| {
                Error::contract_violation("observer is busy and cannot be attached")
            })?;
            if guard.entity_name() != self.entity {
                return Err(Error::contract_violation(format!(
                    "observer expects entity `{}`, store holds `{}`",
                    guard.entity_name(),
                    self.entity
                )));
            }
        }
        self.observers.cleanup();
        Ok(self.observers.register(observer))
    }

    /// Unregisters an observer. Returns true if it was attached.
    pub fn detach(&mut self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    /// Returns the number of live observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn sorted_records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.values().map(|r| (**r).clone()).collect();
        records.sort_by_key(|r| r.id());
        records
    }

    /// Delivers a change to every observer.
    ///
    /// Recoverable observer failures stay with the observer, which keeps its
    /// last good state; fatal ones are returned after every observer was
    /// notified. The mutation itself is never rolled back.
    fn notify(&self, change: &RecordChange) -> Result<()> {
        let observers = self.observers.live();
        if observers.is_empty() {
            return Ok(());
        }
        let mut fatal: Option<Error> = None;
        let mut record = |result: Result<()>| {
            if let Err(err) = result {
                if err.is_fatal() {
                    error!(entity = %self.entity, id = change.id(), error = %err, "observer failed");
                    fatal.get_or_insert(err);
                } else {
                    warn!(entity = %self.entity, id = change.id(), error = %err, "observer kept its previous state");
                }
            }
        };
        for observer in &observers {
            let result = observer.borrow_mut().apply(self, change);
            record(result);
        }
        for observer in &observers {
            let result = observer.borrow().publish();
            record(result);
        }
        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn log_persistence(&self, err: Error) -> Error {
        error!(entity = %self.entity, medium = %self.medium.describe(), error = %err, "persistence failure");
        err
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("entity", &self.entity)
            .field("records", &self.records.len())
            .field("next_id", &self.next_id)
            .field("dirty", &self.dirty)
            .field("medium", &self.medium.describe())
            .finish()
    }
}
