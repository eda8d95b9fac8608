//! Diff scripts between two projections.
//!
//! Used when a live query recomputes from scratch and has to announce the
//! difference between its previous and its new projection. Single-record
//! changes build their script directly in `Projection::replace`.
//!
//! Rows are matched by identity. A surviving row is reported as moved when its
//! section key changed or when it is not part of the longest run of survivors
//! whose relative order is unchanged; every other survivor keeps its place and
//! is reported as updated if its version changed.

use crate::change_event::{ChangeEvent, IndexPath};
use crate::projection::Projection;
use hashbrown::HashMap;
use quiver_core::RecordId;
use std::cmp::Ordering;

/// Computes the diff script turning `old` into `new`, in canonical order.
pub fn diff(old: &Projection, new: &Projection) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (index, section) in old.sections().iter().enumerate() {
        if new.find_section(section.key()).is_err() {
            events.push(ChangeEvent::SectionDelete(index));
        }
    }
    for (index, section) in new.sections().iter().enumerate() {
        if old.find_section(section.key()).is_err() {
            events.push(ChangeEvent::SectionInsert(index));
        }
    }

    // Global rank and path of every row in the new projection.
    let mut new_rows: HashMap<RecordId, (usize, IndexPath)> = HashMap::with_capacity(new.len());
    let mut rank = 0;
    for (s, section) in new.sections().iter().enumerate() {
        for (r, record) in section.rows().iter().enumerate() {
            new_rows.insert(record.id(), (rank, IndexPath::new(s, r)));
            rank += 1;
        }
    }

    struct Survivor {
        from: IndexPath,
        to: IndexPath,
        rank: usize,
        section_changed: bool,
        version_changed: bool,
    }

    let mut survivors = Vec::new();
    let mut kept = hashbrown::HashSet::with_capacity(old.len());
    for (s, section) in old.sections().iter().enumerate() {
        for (r, record) in section.rows().iter().enumerate() {
            let from = IndexPath::new(s, r);
            match new_rows.get(&record.id()) {
                None => events.push(ChangeEvent::RowDelete(from)),
                Some(&(rank, to)) => {
                    kept.insert(record.id());
                    let new_section = &new.sections()[to.section];
                    let new_record = &new_section.rows()[to.row];
                    survivors.push(Survivor {
                        from,
                        to,
                        rank,
                        section_changed: section.key().cmp(new_section.key()) != Ordering::Equal,
                        version_changed: record.version() != new_record.version(),
                    });
                }
            }
        }
    }

    for (s, section) in new.sections().iter().enumerate() {
        for (r, record) in section.rows().iter().enumerate() {
            if !kept.contains(&record.id()) {
                events.push(ChangeEvent::RowInsert(IndexPath::new(s, r)));
            }
        }
    }

    let ranks: Vec<usize> = survivors.iter().map(|s| s.rank).collect();
    let mut stable = vec![false; survivors.len()];
    for index in longest_increasing_subsequence(&ranks) {
        stable[index] = true;
    }
    for (survivor, stable) in survivors.iter().zip(stable) {
        if !stable || survivor.section_changed {
            events.push(ChangeEvent::RowMove(survivor.from, survivor.to));
        } else if survivor.version_changed {
            events.push(ChangeEvent::RowUpdate(survivor.from));
        }
    }

    sort_script(&mut events);
    events
}

/// Sorts events into canonical order: row deletes and section deletes
/// descending, then section inserts and row inserts ascending, then moves by
/// destination, then updates.
pub fn sort_script(events: &mut [ChangeEvent]) {
    events.sort_by(|a, b| {
        a.phase().cmp(&b.phase()).then_with(|| match (a, b) {
            (ChangeEvent::RowDelete(x), ChangeEvent::RowDelete(y)) => y.cmp(x),
            (ChangeEvent::SectionDelete(x), ChangeEvent::SectionDelete(y)) => y.cmp(x),
            (ChangeEvent::SectionInsert(x), ChangeEvent::SectionInsert(y)) => x.cmp(y),
            (ChangeEvent::RowInsert(x), ChangeEvent::RowInsert(y)) => x.cmp(y),
            (ChangeEvent::RowMove(_, x), ChangeEvent::RowMove(_, y)) => x.cmp(y),
            (ChangeEvent::RowUpdate(x), ChangeEvent::RowUpdate(y)) => x.cmp(y),
            _ => Ordering::Equal,
        })
    });
}

/// Indices of one longest strictly increasing subsequence of `values`.
///
/// Patience sorting with back-pointers, O(n log n).
pub fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    // tails[k] = index of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &value) in values.iter().enumerate() {
        let position = tails.partition_point(|&t| values[t] < value);
        if position > 0 {
            previous[i] = Some(tails[position - 1]);
        }
        if position == tails.len() {
            tails.push(i);
        } else {
            tails[position] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = previous[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{fields, Predicate, Record, SortSpec, Value};
    use std::rc::Rc;

    fn rec(id: RecordId, version: u64, name: &str, group: &str) -> Rc<Record> {
        Rc::new(Record::new_with_version(
            id,
            version,
            fields([("name", Value::from(name)), ("group", Value::from(group))]),
        ))
    }

    fn project(records: &[Rc<Record>]) -> Projection {
        let sort = SortSpec::new().by("name").sectioned_by("group");
        Projection::build(records, &Predicate::All, &sort).unwrap()
    }

    fn p(section: usize, row: usize) -> IndexPath {
        IndexPath::new(section, row)
    }

    #[test]
    fn test_lis() {
        assert_eq!(longest_increasing_subsequence(&[]), Vec::<usize>::new());
        assert_eq!(longest_increasing_subsequence(&[0, 1, 2]), vec![0, 1, 2]);
        assert_eq!(longest_increasing_subsequence(&[2, 0, 1]), vec![1, 2]);
        let lis = longest_increasing_subsequence(&[3, 1, 4, 1, 5, 9, 2, 6]);
        assert_eq!(lis.len(), 4);
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let records = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "Y")];
        assert!(diff(&project(&records), &project(&records)).is_empty());
    }

    #[test]
    fn test_diff_from_empty() {
        let records = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "Y")];
        let events = diff(&Projection::new(), &project(&records));
        assert_eq!(
            events,
            vec![
                ChangeEvent::SectionInsert(0),
                ChangeEvent::SectionInsert(1),
                ChangeEvent::RowInsert(p(0, 0)),
                ChangeEvent::RowInsert(p(1, 0)),
            ]
        );
    }

    #[test]
    fn test_diff_to_empty() {
        let records = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "X")];
        let events = diff(&project(&records), &Projection::new());
        assert_eq!(
            events,
            vec![
                ChangeEvent::RowDelete(p(0, 1)),
                ChangeEvent::RowDelete(p(0, 0)),
                ChangeEvent::SectionDelete(0),
            ]
        );
    }

    #[test]
    fn test_diff_single_move() {
        let old = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "X"), rec(3, 1, "c", "X")];
        let new = vec![rec(1, 2, "d", "X"), rec(2, 1, "b", "X"), rec(3, 1, "c", "X")];
        let events = diff(&project(&old), &project(&new));
        assert_eq!(events, vec![ChangeEvent::RowMove(p(0, 0), p(0, 2))]);
    }

    #[test]
    fn test_diff_section_change_is_move() {
        let old = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "Y")];
        let new = vec![rec(1, 2, "a", "Y"), rec(2, 1, "b", "Y")];
        let events = diff(&project(&old), &project(&new));
        assert_eq!(
            events,
            vec![
                ChangeEvent::SectionDelete(0),
                ChangeEvent::RowMove(p(0, 0), p(0, 0)),
            ]
        );
    }

    #[test]
    fn test_diff_update_in_place() {
        let old = vec![rec(1, 1, "a", "X"), rec(2, 1, "b", "X")];
        let new = vec![rec(1, 1, "a", "X"), rec(2, 5, "b", "X")];
        let events = diff(&project(&old), &project(&new));
        assert_eq!(events, vec![ChangeEvent::RowUpdate(p(0, 1))]);
    }

    #[test]
    fn test_sort_script_canonical_order() {
        let mut events = vec![
            ChangeEvent::RowUpdate(p(0, 0)),
            ChangeEvent::RowInsert(p(1, 0)),
            ChangeEvent::RowDelete(p(0, 1)),
            ChangeEvent::SectionInsert(1),
            ChangeEvent::RowDelete(p(0, 2)),
            ChangeEvent::SectionDelete(2),
        ];
        sort_script(&mut events);
        assert_eq!(
            events,
            vec![
                ChangeEvent::RowDelete(p(0, 2)),
                ChangeEvent::RowDelete(p(0, 1)),
                ChangeEvent::SectionDelete(2),
                ChangeEvent::SectionInsert(1),
                ChangeEvent::RowInsert(p(1, 0)),
                ChangeEvent::RowUpdate(p(0, 0)),
            ]
        );
    }
}
