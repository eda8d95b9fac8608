//! Property-based tests for quiver-reactive using proptest.

use proptest::prelude::*;
use quiver_core::{fields, Fields, Predicate, Record, RecordId, Value};
use quiver_reactive::bridge::verify;
use quiver_reactive::diff::diff;
use quiver_reactive::{ChangeEvent, FetchRequest, LiveQuery, Projection, ProjectionMapper, Subscription};
use quiver_storage::{RecordStore, StoreConfig};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Query shapes every property runs against.
#[derive(Clone, Copy, Debug)]
enum Config {
    /// Sectioned by group, sorted by name, local filter.
    Sectioned,
    /// Sectioned by group, identity order inside sections.
    SectionOnly,
    /// One section sorted by name.
    Unsectioned,
    /// No sort keys at all.
    Unsorted,
    /// Sectioned and sorted, every record matches.
    Everything,
    /// Sectioned and sorted, filtered by a threshold outside the records.
    External,
}

fn config() -> impl Strategy<Value = Config> {
    prop_oneof![
        Just(Config::Sectioned),
        Just(Config::SectionOnly),
        Just(Config::Unsectioned),
        Just(Config::Unsorted),
        Just(Config::Everything),
        Just(Config::External),
    ]
}

fn request(config: Config, limit: &Rc<Cell<i64>>) -> FetchRequest {
    let base = FetchRequest::new("Item");
    match config {
        Config::Sectioned => base
            .sort_by("name")
            .section_by("group")
            .filter(Predicate::lt("name", 15i64)),
        Config::SectionOnly => base.section_by("group").filter(Predicate::ne("group", "G1")),
        Config::Unsectioned => base.sort_by("name").filter(Predicate::gt("name", 3i64)),
        Config::Unsorted => {
            base.filter(Predicate::lt("name", 10i64).or(Predicate::is_null("group")))
        }
        Config::Everything => base
            .sort_by("name")
            .section_by("group")
            .filter(Predicate::All),
        Config::External => {
            let limit = limit.clone();
            base.sort_by("name")
                .section_by("group")
                .filter(Predicate::external(move |r: &Record| {
                    Ok(r.value("name").as_i64().unwrap_or(0) < limit.get())
                }))
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert { name: u8, group: u8 },
    Update { pick: usize, name: u8, group: u8 },
    Delete { pick: usize },
    /// Moves the external threshold, then inserts so the store notifies.
    Retune { limit: u8, name: u8, group: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..20, 0u8..6).prop_map(|(name, group)| Op::Insert { name, group }),
        (any::<usize>(), 0u8..20, 0u8..6).prop_map(|(pick, name, group)| Op::Update {
            pick,
            name,
            group
        }),
        any::<usize>().prop_map(|pick| Op::Delete { pick }),
        (0u8..20, 0u8..20, 0u8..6).prop_map(|(limit, name, group)| Op::Retune {
            limit,
            name,
            group
        }),
    ]
}

/// Groups 0..4 are named, 4 leaves the field out and 5 stores an explicit null.
fn item(name: u8, group: u8) -> Fields {
    let mut f = fields([("name", Value::Int64(name as i64))]);
    match group {
        4 => {}
        5 => {
            f.insert("group".into(), Value::Null);
        }
        g => {
            f.insert("group".into(), Value::String(format!("G{}", g)));
        }
    }
    f
}

/// Applies one op; picks wrap around the current identities.
fn apply(store: &mut RecordStore, limit: &Cell<i64>, op: &Op) {
    let ids = store.ids();
    match op {
        Op::Insert { name, group } => {
            store.insert(item(*name, *group)).unwrap();
        }
        Op::Update { pick, name, group } if !ids.is_empty() => {
            let id = ids[pick % ids.len()];
            let (name, group) = (*name, *group);
            store
                .update(id, move |f| {
                    *f = item(name, group);
                })
                .unwrap();
        }
        Op::Delete { pick } if !ids.is_empty() => {
            store.delete(ids[pick % ids.len()]).unwrap();
        }
        Op::Retune { limit: to, name, group } => {
            limit.set(*to as i64);
            store.insert(item(*name, *group)).unwrap();
        }
        _ => {}
    }
}

fn rec(id: RecordId, version: u64, name: u8, group: u8) -> Rc<Record> {
    Rc::new(Record::new_with_version(id, version, item(name, group)))
}

proptest! {
    /// Incremental maintenance ends in the same projection as a full rebuild,
    /// every delivered script turns the previous shape into the new one, and
    /// there is exactly one section per distinct section key among matches.
    #[test]
    fn incremental_matches_full_refresh(
        config in config(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let limit = Rc::new(Cell::new(10i64));
        let mut store = RecordStore::new(StoreConfig::builder("Item").build().unwrap());
        let query = Rc::new(RefCell::new(LiveQuery::new(
            request(config, &limit),
            ProjectionMapper::<Record>::from_record(),
        )));
        LiveQuery::attach(&query, &mut store).unwrap();

        let cycle: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = cycle.clone();
        query.borrow_mut().subscribe(Subscription::new().on_change(move |e| sink.borrow_mut().push(*e)));

        for op in &ops {
            let before = query.borrow().projection().shape();
            apply(&mut store, &limit, op);
            let q = query.borrow();
            prop_assert!(!q.is_stale());

            let predicate = q.request().predicate();
            let sort = q.request().sort();
            let rebuilt = Projection::build(store.records(), predicate, sort).unwrap();
            prop_assert!(q.projection().same_as(&rebuilt), "{:?} diverged after {:?}", config, op);

            let shape = q.projection().shape();
            let events = cycle.take();
            prop_assert!(verify(&events, &before, &shape).is_ok(), "bad script {:?}", events);
            if predicate.is_local() {
                prop_assert!(events.len() <= 3, "{:?} sent {:?}", config, events);
            }

            let mut keys = BTreeSet::new();
            let mut matching = 0;
            for record in store.records() {
                if predicate.eval(record).unwrap() {
                    keys.insert(sort.section_value(record));
                    matching += 1;
                }
            }
            prop_assert_eq!(q.section_count(), keys.len());
            prop_assert_eq!(shape.iter().map(|rows| rows.len()).sum::<usize>(), matching);
            prop_assert!(shape.iter().all(|rows| !rows.is_empty()));
        }
    }

    /// The general diff between two arbitrary projections always verifies.
    #[test]
    fn general_diff_verifies(
        config in config(),
        old in prop::collection::btree_map(0u64..30, (1u64..3, 0u8..10, 0u8..6), 0..25),
        new in prop::collection::btree_map(0u64..30, (1u64..3, 0u8..10, 0u8..6), 0..25),
    ) {
        let sort = request(config, &Rc::new(Cell::new(10))).sort().clone();
        let build = |records: &std::collections::BTreeMap<u64, (u64, u8, u8)>| {
            let records: Vec<Rc<Record>> = records
                .iter()
                .map(|(id, (version, name, group))| rec(*id, *version, *name, *group))
                .collect();
            Projection::build(&records, &Predicate::All, &sort).unwrap()
        };
        let (old, new) = (build(&old), build(&new));
        let script = diff(&old, &new);
        prop_assert!(verify(&script, &old.shape(), &new.shape()).is_ok(), "bad script {:?}", script);
        if old.same_as(&new) {
            prop_assert!(script.is_empty());
        }
    }
}
