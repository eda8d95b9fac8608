//! Controller facade.
//!
//! A `Controller` pairs a shared `RecordStore` with one `LiveQuery` and exposes
//! the operations a list or table view needs: counts and labels for layout,
//! items by index path, and mutations addressed by index path. Mutations go
//! through the store, so every other live query on the same store sees them
//! too.

use hashbrown::HashSet;
use quiver_core::{Error, Fields, RecordId, Result};
use quiver_reactive::{
    ChangeEvent, FetchRequest, IndexPath, LiveQuery, ProjectionMapper, Subscription,
    SubscriptionId,
};
use quiver_storage::RecordStore;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

type Hook = Rc<dyn Fn()>;
type ChangeHook = Rc<dyn Fn(&ChangeEvent)>;

/// Live query plus store access, addressed by index path.
pub struct Controller<V> {
    store: Rc<RefCell<RecordStore>>,
    query: Rc<RefCell<LiveQuery<V>>>,
    begin_update: Option<Hook>,
    end_update: Option<Hook>,
    change: Option<ChangeHook>,
    /// Subscription carrying the three hooks, if any is set.
    subscription: Option<SubscriptionId>,
}

impl<V: 'static> Controller<V> {
    /// Creates the live query, attaches it to the store and fetches it.
    pub fn new(
        store: Rc<RefCell<RecordStore>>,
        request: FetchRequest,
        mapper: ProjectionMapper<V>,
    ) -> Result<Self> {
        let query = Rc::new(RefCell::new(LiveQuery::new(request, mapper)));
        {
            let mut guard = store
                .try_borrow_mut()
                .map_err(|_| Error::contract_violation("store is busy"))?;
            LiveQuery::attach(&query, &mut guard)?;
        }
        Ok(Self {
            store,
            query,
            begin_update: None,
            end_update: None,
            change: None,
            subscription: None,
        })
    }
}

impl<V> Controller<V> {
    /// Recomputes the live query from scratch and delivers the difference.
    pub fn fetch(&self) -> Result<()> {
        {
            let store = self.store_ref()?;
            self.query_mut()?.recompute(&store)?;
        }
        self.query_ref()?.publish()
    }

    /// Inserts a record and returns its identity.
    pub fn add(&self, fields: Fields) -> Result<RecordId> {
        let mut store = self.store_mut()?;
        let id = store.insert(fields)?;
        Self::after_mutation(&mut store)?;
        Ok(id)
    }

    /// Deletes the records at `paths`.
    ///
    /// Every path is resolved against the current projection before anything
    /// is deleted; an unresolvable path deletes nothing.
    pub fn delete_items(&self, paths: &[IndexPath]) -> Result<()> {
        let mut seen = HashSet::with_capacity(paths.len());
        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            let id = self.resolve(*path)?;
            if seen.insert(id) {
                ids.push(id);
            }
        }

        let mut store = self.store_mut()?;
        for id in &ids {
            store.delete(*id)?;
        }
        debug!(entity = %store.entity_name(), count = ids.len(), "items deleted");
        Self::after_mutation(&mut store)
    }

    /// Mutates the fields of the record at `path`.
    pub fn update_model<F>(&self, path: IndexPath, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Fields),
    {
        let id = self.resolve(path)?;
        let mut store = self.store_mut()?;
        store.update(id, mutator)?;
        Self::after_mutation(&mut store)
    }

    /// Mapped view at `path`.
    pub fn item(&self, path: IndexPath) -> Option<V> {
        self.query.try_borrow().ok()?.view_at(path)
    }

    /// Rows in `section`, 0 when out of range.
    pub fn number_of_items(&self, section: usize) -> usize {
        self.query
            .try_borrow()
            .map(|q| q.row_count(section))
            .unwrap_or(0)
    }

    /// Number of sections; 0 when nothing matches.
    pub fn number_of_sections(&self) -> usize {
        self.query
            .try_borrow()
            .map(|q| q.section_count())
            .unwrap_or(0)
    }

    /// Label of `section`, `None` when out of range or unsectioned.
    pub fn section_label(&self, section: usize) -> Option<String> {
        self.query.try_borrow().ok()?.section_label(section)
    }

    /// Index of the section labelled `label`.
    pub fn section_index_for_label(&self, label: &str) -> Option<usize> {
        self.query.try_borrow().ok()?.section_index_for_label(label)
    }

    /// Called before each delivered change cycle.
    pub fn on_begin_update<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() + 'static,
    {
        self.begin_update = Some(Rc::new(callback));
        self.install_hooks()
    }

    /// Called after each delivered change cycle.
    pub fn on_end_update<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() + 'static,
    {
        self.end_update = Some(Rc::new(callback));
        self.install_hooks()
    }

    /// Called for every change event.
    pub fn on_change<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.change = Some(Rc::new(callback));
        self.install_hooks()
    }

    /// Removes all three callbacks.
    pub fn clear_callbacks(&mut self) -> Result<()> {
        self.begin_update = None;
        self.end_update = None;
        self.change = None;
        self.install_hooks()
    }

    /// Checkpoints the store.
    pub fn save(&self) -> Result<()> {
        self.store_mut()?.checkpoint()
    }

    /// Returns the live query.
    pub fn query(&self) -> &Rc<RefCell<LiveQuery<V>>> {
        &self.query
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Rc<RefCell<RecordStore>> {
        &self.store
    }

    /// Replaces the hook subscription with one carrying the current hooks.
    fn install_hooks(&mut self) -> Result<()> {
        let mut query = self
            .query
            .try_borrow_mut()
            .map_err(|_| Error::contract_violation("live query is delivering changes"))?;
        if let Some(id) = self.subscription.take() {
            query.unsubscribe(id);
        }
        if self.begin_update.is_none() && self.end_update.is_none() && self.change.is_none() {
            return Ok(());
        }

        let mut subscription = Subscription::new();
        if let Some(hook) = self.begin_update.clone() {
            subscription = subscription.on_will_change(move || hook());
        }
        if let Some(hook) = self.end_update.clone() {
            subscription = subscription.on_did_change(move || hook());
        }
        if let Some(hook) = self.change.clone() {
            subscription = subscription.on_change(move |event| hook(event));
        }
        self.subscription = Some(query.subscribe(subscription));
        Ok(())
    }

    fn resolve(&self, path: IndexPath) -> Result<RecordId> {
        self.query_ref()?
            .item_at(path)
            .map(|record| record.id())
            .ok_or_else(|| Error::contract_violation(format!("no item at index path {}", path)))
    }

    fn after_mutation(store: &mut RecordStore) -> Result<()> {
        if store.auto_checkpoint() {
            store.checkpoint()?;
        }
        Ok(())
    }

    fn store_ref(&self) -> Result<Ref<'_, RecordStore>> {
        self.store
            .try_borrow()
            .map_err(|_| Error::contract_violation("store is being mutated"))
    }

    fn store_mut(&self) -> Result<RefMut<'_, RecordStore>> {
        self.store.try_borrow_mut().map_err(|_| {
            Error::contract_violation("store mutated while it is delivering changes")
        })
    }

    fn query_ref(&self) -> Result<Ref<'_, LiveQuery<V>>> {
        self.query
            .try_borrow()
            .map_err(|_| Error::contract_violation("live query is being recomputed"))
    }

    fn query_mut(&self) -> Result<RefMut<'_, LiveQuery<V>>> {
        self.query
            .try_borrow_mut()
            .map_err(|_| Error::contract_violation("live query is delivering changes"))
    }
}

impl<V> Drop for Controller<V> {
    fn drop(&mut self) {
        let (Ok(mut store), Ok(mut query)) = (self.store.try_borrow_mut(), self.query.try_borrow_mut())
        else {
            warn!("controller dropped while busy; live query detaches when released");
            return;
        };
        query.detach(&mut store);
    }
}

impl<V> fmt::Debug for Controller<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("query", &self.query)
            .field("subscription", &self.subscription)
            .finish()
    }
}
