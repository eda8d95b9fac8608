//! Store observer registry.
//!
//! Live queries register with a store through `ObserverRegistry`, which holds
//! weak references so that dropping a query detaches it implicitly.

use crate::change::RecordChange;
use crate::store::RecordStore;
use hashbrown::HashMap;
use quiver_core::{Error, Result};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Unique identifier for a registered observer.
pub type ObserverId = u64;

/// Something that keeps derived state in sync with a record store.
///
/// Notification is two-phase. `apply` runs for every observer with mutable
/// access and stages whatever the observer wants to announce; `publish` then
/// runs with shared access, so callbacks fired from it may read the observer.
pub trait StoreObserver {
    /// Entity name the observer expects the store to hold.
    fn entity_name(&self) -> &str;

    /// Updates derived state for one change. The store already reflects it.
    fn apply(&mut self, store: &RecordStore, change: &RecordChange) -> Result<()>;

    /// Delivers whatever `apply` staged.
    fn publish(&self) -> Result<()>;
}

/// Shared handle to an observer.
pub type SharedObserver = Rc<RefCell<dyn StoreObserver>>;

/// Registry of observers attached to one store.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: HashMap<ObserverId, Weak<RefCell<dyn StoreObserver>>>,
    next_id: ObserverId,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers an observer and returns its ID.
    pub fn register(&mut self, observer: &SharedObserver) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.insert(id, Rc::downgrade(observer));
        id
    }

    /// Unregisters an observer by ID.
    ///
    /// Returns true if the observer was found and removed.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns strong handles to every live observer, ordered by registration.
    pub fn live(&self) -> Vec<SharedObserver> {
        let mut entries: Vec<_> = self
            .observers
            .iter()
            .filter_map(|(id, weak)| weak.upgrade().map(|rc| (*id, rc)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, rc)| rc).collect()
    }

    /// Fails if any observer is currently borrowed, i.e. a mutation was
    /// attempted from inside an observer callback.
    pub fn ensure_idle(&self) -> Result<()> {
        for observer in self.live() {
            if observer.try_borrow_mut().is_err() {
                return Err(Error::contract_violation(
                    "store mutated while one of its observers is delivering changes",
                ));
            }
        }
        Ok(())
    }

    /// Returns the number of live observers.
    pub fn len(&self) -> usize {
        self.observers
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Returns true if no live observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes entries whose observer has been dropped.
    pub fn cleanup(&mut self) {
        self.observers.retain(|_, w| w.strong_count() > 0);
    }
}
