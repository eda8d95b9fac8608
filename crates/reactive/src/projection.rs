//! Materialized, sectioned projection of a live query.
//!
//! A projection is an ordered list of non-empty sections, each an ordered list
//! of record snapshots. Section keys are strictly ascending and rows inside a
//! section are ascending by `SortSpec::compare`, so both levels support binary
//! search. An unsectioned projection has a single `Null`-keyed section when it
//! has rows and no section at all when it is empty.

use crate::change_event::{ChangeEvent, IndexPath};
use quiver_core::{Predicate, Record, RecordId, Result, SortSpec, Value};
use std::cmp::Ordering;
use std::rc::Rc;

/// Record identities per section, used to check diff scripts.
pub type Shape = Vec<Vec<RecordId>>;

/// One group of rows sharing a section key.
#[derive(Clone, Debug)]
pub struct Section {
    key: Value,
    rows: Vec<Rc<Record>>,
}

impl Section {
    fn new(key: Value) -> Self {
        Self {
            key,
            rows: Vec::new(),
        }
    }

    /// Returns the section key.
    #[inline]
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Returns the rows in order.
    #[inline]
    pub fn rows(&self) -> &[Rc<Record>] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ordered, sectioned rows of a live query.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    sections: Vec<Section>,
}

impl Projection {
    /// Creates an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes a projection from scratch.
    ///
    /// Fails on the first record the predicate cannot evaluate; nothing is
    /// returned in that case.
    pub fn build<'a, I>(records: I, predicate: &Predicate, sort: &SortSpec) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Rc<Record>>,
    {
        let mut matching = Vec::new();
        for record in records {
            if predicate.eval(record)? {
                matching.push(Rc::clone(record));
            }
        }
        matching.sort_by(|a, b| sort.compare(a, b));

        let mut sections: Vec<Section> = Vec::new();
        for record in matching {
            let key = sort.section_value(&record);
            match sections.last_mut() {
                Some(section) if section.key.cmp(&key) == Ordering::Equal => {
                    section.rows.push(record)
                }
                _ => {
                    let mut section = Section::new(key);
                    section.rows.push(record);
                    sections.push(section);
                }
            }
        }
        Ok(Self { sections })
    }

    /// Returns the sections.
    #[inline]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[inline]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Row count of a section, 0 when out of range.
    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map(|s| s.len()).unwrap_or(0)
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Bounds-checked row lookup.
    pub fn get(&self, path: IndexPath) -> Option<&Rc<Record>> {
        self.sections.get(path.section)?.rows.get(path.row)
    }

    /// Iterates over all rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Record>> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    /// Finds the section holding `key`.
    pub fn find_section(&self, key: &Value) -> core::result::Result<usize, usize> {
        self.sections.binary_search_by(|s| s.key.cmp(key))
    }

    /// Finds where `record` sits, comparing by its sort keys and identity.
    ///
    /// Returns `None` when no row with the same keys and identity exists.
    pub fn locate(&self, record: &Record, sort: &SortSpec) -> Option<IndexPath> {
        let key = sort.section_value(record);
        let section = self.find_section(&key).ok()?;
        let row = self.sections[section]
            .rows
            .binary_search_by(|r| sort.compare(r, record))
            .ok()?;
        Some(IndexPath::new(section, row))
    }

    /// Record identities per section.
    pub fn shape(&self) -> Shape {
        self.sections
            .iter()
            .map(|s| s.rows.iter().map(|r| r.id()).collect())
            .collect()
    }

    /// True when both projections hold the same snapshots in the same places.
    pub fn same_as(&self, other: &Projection) -> bool {
        self.sections.len() == other.sections.len()
            && self.sections.iter().zip(&other.sections).all(|(a, b)| {
                a.key.cmp(&b.key) == Ordering::Equal
                    && a.rows.len() == b.rows.len()
                    && a.rows.iter().zip(&b.rows).all(|(x, y)| **x == **y)
            })
    }

    /// Applies one record change in place and returns its diff script.
    ///
    /// `old_path` is where the record sat before the change (if it was in the
    /// projection); `new` is the record after the change if it now matches.
    pub(crate) fn replace(
        &mut self,
        old_path: Option<IndexPath>,
        new: Option<Rc<Record>>,
        sort: &SortSpec,
    ) -> Vec<ChangeEvent> {
        // A row that stays in its section must not drop and recreate it.
        let keeps_section = match (old_path, &new) {
            (Some(path), Some(record)) => {
                self.sections[path.section].key.cmp(&sort.section_value(record)) == Ordering::Equal
            }
            _ => false,
        };

        let mut section_deleted = None;
        let old_version = old_path.map(|path| {
            let section = &mut self.sections[path.section];
            let removed = section.rows.remove(path.row);
            if section.rows.is_empty() && !keeps_section {
                self.sections.remove(path.section);
                section_deleted = Some(path.section);
            }
            removed.version()
        });

        let mut section_inserted = None;
        let new_path = new.map(|record| {
            let key = sort.section_value(&record);
            let section = match self.find_section(&key) {
                Ok(index) => index,
                Err(index) => {
                    self.sections.insert(index, Section::new(key));
                    section_inserted = Some(index);
                    index
                }
            };
            let rows = &mut self.sections[section].rows;
            let row = match rows.binary_search_by(|r| sort.compare(r, &record)) {
                Ok(index) | Err(index) => index,
            };
            rows.insert(row, record);
            IndexPath::new(section, row)
        });

        let mut events = Vec::with_capacity(3);
        match (old_path, new_path) {
            (Some(from), None) => {
                events.push(ChangeEvent::RowDelete(from));
                events.extend(section_deleted.map(ChangeEvent::SectionDelete));
            }
            (None, Some(to)) => {
                events.extend(section_inserted.map(ChangeEvent::SectionInsert));
                events.push(ChangeEvent::RowInsert(to));
            }
            (Some(from), Some(to)) => {
                let stayed = from == to && section_deleted.is_none() && section_inserted.is_none();
                if stayed {
                    let new_version = self.get(to).map(|r| r.version());
                    if old_version != new_version {
                        events.push(ChangeEvent::RowUpdate(from));
                    }
                } else {
                    events.extend(section_deleted.map(ChangeEvent::SectionDelete));
                    events.extend(section_inserted.map(ChangeEvent::SectionInsert));
                    events.push(ChangeEvent::RowMove(from, to));
                }
            }
            (None, None) => {}
        }
        events
    }
}
