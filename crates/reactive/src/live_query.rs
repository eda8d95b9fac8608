//! Live queries over a record store.
//!
//! A `LiveQuery` keeps a sectioned projection of the records matching its
//! fetch request and tells subscribers how that projection changes. It plugs
//! into a `RecordStore` as a `StoreObserver`: every store mutation is applied
//! incrementally where possible, staged as a diff script, checked by the
//! change bridge and delivered once the store has finished notifying.
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{fields, Record};
//! use quiver_reactive::{FetchRequest, LiveQuery, ProjectionMapper};
//! use quiver_storage::{RecordStore, StoreConfig};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let mut store = RecordStore::new(StoreConfig::builder("Task").build().unwrap());
//! store.insert(fields([("name", "b"), ("group", "X")])).unwrap();
//!
//! let request = FetchRequest::new("Task").sort_by("name").section_by("group");
//! let query = Rc::new(RefCell::new(LiveQuery::new(request, ProjectionMapper::<Record>::from_record())));
//! LiveQuery::attach(&query, &mut store).unwrap();
//!
//! store.insert(fields([("name", "a"), ("group", "X")])).unwrap();
//! assert_eq!(query.borrow().row_count(0), 2);
//! assert_eq!(query.borrow().section_label(0).as_deref(), Some("X"));
//! ```

use crate::bridge::ChangeBridge;
use crate::change_event::{ChangeEvent, IndexPath};
use crate::diff::diff;
use crate::mapper::ProjectionMapper;
use crate::projection::Projection;
use crate::request::FetchRequest;
use crate::subscription::{Subscription, SubscriptionId};
use quiver_core::{Error, Record, RecordId, Result};
use quiver_storage::{ObserverId, RecordChange, RecordStore, SharedObserver, StoreObserver};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// A query whose projection follows a record store.
pub struct LiveQuery<V> {
    request: FetchRequest,
    mapper: ProjectionMapper<V>,
    projection: Projection,
    bridge: ChangeBridge,
    /// Events staged by the last recomputation, drained by `publish`.
    pending: RefCell<Vec<ChangeEvent>>,
    fetched: bool,
    /// Set after a failed recomputation; the next change recomputes in full.
    stale: bool,
    last_error: Option<Error>,
    observer: Option<ObserverId>,
}

impl<V> LiveQuery<V> {
    /// Creates an unfetched query.
    pub fn new(request: FetchRequest, mapper: ProjectionMapper<V>) -> Self {
        let bridge = ChangeBridge::new(request.verifies_diffs());
        Self {
            request,
            mapper,
            projection: Projection::new(),
            bridge,
            pending: RefCell::new(Vec::new()),
            fetched: false,
            stale: false,
            last_error: None,
            observer: None,
        }
    }

    /// Registers the query with a store and fetches it.
    ///
    /// The query is attached even if the initial fetch fails; it is then
    /// stale and recomputes in full on the next change.
    pub fn attach(query: &Rc<RefCell<Self>>, store: &mut RecordStore) -> Result<()>
    where
        V: 'static,
    {
        if query.borrow().observer.is_some() {
            return Err(Error::contract_violation("live query is already attached"));
        }
        let shared: SharedObserver = query.clone();
        let id = store.attach(&shared)?;
        query.borrow_mut().observer = Some(id);
        debug!(entity = %store.entity_name(), observer = id, "live query attached");

        query.borrow_mut().recompute(store)?;
        query.borrow().publish()
    }

    /// Stops following the store. Returns true if the query was attached.
    pub fn detach(&mut self, store: &mut RecordStore) -> bool {
        match self.observer.take() {
            Some(id) => store.detach(id),
            None => false,
        }
    }

    /// Returns true while registered with a store.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.observer.is_some()
    }

    /// Recomputes from scratch and delivers the resulting cycle.
    ///
    /// Subscribers run while `self` is borrowed mutably; callers that hand out
    /// the query through a `RefCell` and want callbacks to read it should call
    /// `recompute` and `publish` separately.
    pub fn refresh(&mut self, store: &RecordStore) -> Result<()> {
        self.recompute(store)?;
        self.publish()
    }

    /// Recomputes the projection from every record in the store and stages
    /// the diff against the previous projection.
    ///
    /// The first successful recomputation stages nothing, unless an earlier
    /// attempt failed: subscribers may already be watching the empty
    /// projection then, so the rows arrive as inserts. On failure the
    /// previous projection is kept and the query becomes stale.
    pub fn recompute(&mut self, store: &RecordStore) -> Result<()> {
        if store.entity_name() != self.request.entity() {
            return Err(Error::contract_violation(format!(
                "query for `{}` cannot read store of `{}`",
                self.request.entity(),
                store.entity_name()
            )));
        }
        let projection =
            match Projection::build(store.records(), self.request.predicate(), self.request.sort()) {
                Ok(projection) => projection,
                Err(err) => return Err(self.fail(err)),
            };

        let events = if self.fetched || self.stale {
            diff(&self.projection, &projection)
        } else {
            Vec::new()
        };
        if !events.is_empty() && self.bridge.verifies() {
            if let Err(err) = self
                .bridge
                .check(&events, &self.projection.shape(), &projection.shape())
            {
                return Err(self.fail(err));
            }
        }

        debug!(
            entity = %self.request.entity(),
            rows = projection.len(),
            sections = projection.section_count(),
            events = events.len(),
            "live query recomputed"
        );
        self.projection = projection;
        self.fetched = true;
        self.stale = false;
        self.last_error = None;
        self.pending.borrow_mut().extend(events);
        Ok(())
    }

    /// Applies one store change and stages its diff script.
    ///
    /// Only the changed record is evaluated; its old row is located and its
    /// new row found by binary search. Queries with an external predicate,
    /// in a stale state, or never fetched successfully recompute in full
    /// instead.
    pub fn on_record_changed(&mut self, store: &RecordStore, change: &RecordChange) -> Result<()> {
        if self.stale || !self.fetched || !self.request.predicate().is_local() {
            trace!(
                id = change.id(),
                stale = self.stale,
                fetched = self.fetched,
                "full recompute for change"
            );
            return self.recompute(store);
        }

        let new = match change.new_record() {
            Some(record) => match self.request.predicate().eval(record) {
                Ok(true) => Some(Rc::clone(record)),
                Ok(false) => None,
                Err(err) => return Err(self.fail(err)),
            },
            None => None,
        };
        let sort = self.request.sort();
        let old_path = change.old().and_then(|old| self.projection.locate(old, sort));

        let before = self.bridge.verifies().then(|| self.projection.shape());
        let events = self.projection.replace(old_path, new, sort);
        if let Some(before) = before {
            if let Err(err) = self
                .bridge
                .check(&events, &before, &self.projection.shape())
            {
                return Err(self.fail(err));
            }
        }

        trace!(
            id = change.id(),
            kind = ?change.kind(),
            events = events.len(),
            "change applied incrementally"
        );
        self.last_error = None;
        self.pending.borrow_mut().extend(events);
        Ok(())
    }

    /// Delivers the staged cycle, if any, to every subscriber.
    pub fn publish(&self) -> Result<()> {
        let events = self.pending.take();
        self.bridge.deliver(&events);
        Ok(())
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(entity = %self.request.entity(), error = %err, "live query is stale");
        self.stale = true;
        self.last_error = Some(err.clone());
        err
    }

    /// Record snapshot at `path`, `None` when out of range.
    pub fn item_at(&self, path: IndexPath) -> Option<Rc<Record>> {
        self.projection.get(path).cloned()
    }

    /// Mapped view of the record at `path`.
    pub fn view_at(&self, path: IndexPath) -> Option<V> {
        self.projection.get(path).map(|record| self.mapper.map(record))
    }

    /// Mapped views of every row, in order.
    pub fn views(&self) -> Vec<V> {
        self.projection.iter().map(|r| self.mapper.map(r)).collect()
    }

    /// Number of sections. Zero for an empty or unfetched query.
    #[inline]
    pub fn section_count(&self) -> usize {
        self.projection.section_count()
    }

    /// Rows in `section`, 0 when out of range.
    #[inline]
    pub fn row_count(&self, section: usize) -> usize {
        self.projection.row_count(section)
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.projection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projection.is_empty()
    }

    /// Label of a section. `None` when out of range or unsectioned.
    pub fn section_label(&self, section: usize) -> Option<String> {
        if !self.request.sort().is_sectioned() {
            return None;
        }
        self.projection
            .sections()
            .get(section)
            .map(|s| s.key().to_label())
    }

    /// Labels of every section; empty when unsectioned.
    pub fn section_labels(&self) -> Vec<String> {
        if !self.request.sort().is_sectioned() {
            return Vec::new();
        }
        self.projection
            .sections()
            .iter()
            .map(|s| s.key().to_label())
            .collect()
    }

    /// Index of the first section whose label equals `label`.
    pub fn section_index_for_label(&self, label: &str) -> Option<usize> {
        if !self.request.sort().is_sectioned() {
            return None;
        }
        self.projection
            .sections()
            .iter()
            .position(|s| s.key().to_label() == label)
    }

    /// Path of the row holding `id`.
    pub fn path_of(&self, id: RecordId) -> Option<IndexPath> {
        self.projection
            .sections()
            .iter()
            .enumerate()
            .find_map(|(section, s)| {
                s.rows()
                    .iter()
                    .position(|r| r.id() == id)
                    .map(|row| IndexPath::new(section, row))
            })
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Error of the last failed recomputation, cleared by the next success.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    #[inline]
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self, subscription: Subscription) -> SubscriptionId {
        self.bridge.subscribe(subscription)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bridge.unsubscribe(id)
    }

    /// Removes every subscriber.
    pub fn clear_subscriptions(&mut self) {
        self.bridge.clear();
    }

    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.bridge.subscription_count()
    }
}

impl<V> StoreObserver for LiveQuery<V> {
    fn entity_name(&self) -> &str {
        self.request.entity()
    }

    fn apply(&mut self, store: &RecordStore, change: &RecordChange) -> Result<()> {
        self.on_record_changed(store, change)
    }

    fn publish(&self) -> Result<()> {
        LiveQuery::publish(self)
    }
}

impl<V> fmt::Debug for LiveQuery<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery")
            .field("request", &self.request)
            .field("rows", &self.projection.len())
            .field("sections", &self.projection.section_count())
            .field("fetched", &self.fetched)
            .field("stale", &self.stale)
            .finish()
    }
}
