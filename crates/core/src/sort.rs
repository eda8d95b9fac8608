//! Sort specification for live queries.
//!
//! Rows are ordered by `(section key, primary key, identity)`, all ascending.
//! The section key leads so that rows sharing a section value are contiguous.

use crate::record::Record;
use crate::value::Value;
use alloc::string::String;
use core::cmp::Ordering;

/// Ascending sort and section keys of a live query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    primary: Option<String>,
    section: Option<String>,
}

impl SortSpec {
    /// Creates an empty spec: one implicit section, identity order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary sort key.
    pub fn by(mut self, field: impl Into<String>) -> Self {
        self.primary = Some(field.into());
        self
    }

    /// Sets the secondary (section) key.
    pub fn sectioned_by(mut self, field: impl Into<String>) -> Self {
        self.section = Some(field.into());
        self
    }

    /// Returns the primary sort key.
    #[inline]
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Returns the section key.
    #[inline]
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Returns true when rows are partitioned by a section key.
    #[inline]
    pub fn is_sectioned(&self) -> bool {
        self.section.is_some()
    }

    /// Returns the section value of a record. Unsectioned specs put every
    /// record in the `Null` section.
    pub fn section_value(&self, record: &Record) -> Value {
        match &self.section {
            Some(field) => record.value(field).clone(),
            None => Value::Null,
        }
    }

    /// Compares two records by section key, primary key, then identity.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        if let Some(field) = &self.section {
            let cmp = a.value(field).cmp(b.value(field));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        if let Some(field) = &self.primary {
            let cmp = a.value(field).cmp(b.value(field));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        a.id().cmp(&b.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{fields, RecordId};
    use alloc::vec;
    use alloc::vec::Vec;

    fn rec(id: RecordId, name: &str, group: &str) -> Record {
        Record::new(id, fields([("name", name), ("group", group)]))
    }

    #[test]
    fn test_sort_spec_builder() {
        let spec = SortSpec::new().by("name").sectioned_by("group");
        assert_eq!(spec.primary(), Some("name"));
        assert_eq!(spec.section(), Some("group"));
        assert!(spec.is_sectioned());
        assert!(!SortSpec::new().is_sectioned());
    }

    #[test]
    fn test_section_key_leads() {
        let spec = SortSpec::new().by("name").sectioned_by("group");
        let a = rec(1, "a", "Y");
        let b = rec(2, "b", "X");
        assert_eq!(spec.compare(&a, &b), Ordering::Greater);
        assert_eq!(spec.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_identity_breaks_ties() {
        let spec = SortSpec::new().by("name");
        let a = rec(3, "same", "X");
        let b = rec(5, "same", "X");
        assert_eq!(spec.compare(&a, &b), Ordering::Less);
        assert_eq!(spec.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_compare_sorts_sections_contiguously() {
        let spec = SortSpec::new().by("name").sectioned_by("group");
        let mut records = vec![
            rec(1, "c", "X"),
            rec(2, "a", "Y"),
            rec(3, "b", "X"),
            Record::new(4, fields([("name", "z")])),
        ];
        records.sort_by(|a, b| spec.compare(a, b));
        let ids: Vec<RecordId> = records.iter().map(|r| r.id()).collect();
        // The record without a group sorts first, in the Null section.
        assert_eq!(ids, vec![4, 3, 1, 2]);
    }

    #[test]
    fn test_compare_without_keys_is_identity_order() {
        let spec = SortSpec::new();
        assert_eq!(spec.compare(&rec(2, "a", "X"), &rec(1, "b", "Y")), Ordering::Greater);
    }

    #[test]
    fn test_unsectioned_value_is_null() {
        let spec = SortSpec::new().by("name");
        assert!(spec.section_value(&rec(1, "a", "X")).is_null());
    }
}
