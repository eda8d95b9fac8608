//! Fetch requests describing a live query.

use quiver_core::{Predicate, SortSpec};

/// Entity, filter and ordering of a live query.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    entity: String,
    predicate: Predicate,
    sort: SortSpec,
    verify_diffs: bool,
}

impl FetchRequest {
    /// Requests every record of an entity in identity order, unsectioned.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: Predicate::All,
            sort: SortSpec::new(),
            verify_diffs: true,
        }
    }

    /// Sets the primary sort key (ascending).
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort = self.sort.by(field);
        self
    }

    /// Partitions rows into sections by this key (ascending).
    pub fn section_by(mut self, field: impl Into<String>) -> Self {
        self.sort = self.sort.sectioned_by(field);
        self
    }

    /// Restricts rows to records matching the predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Checks every diff script against the projection before delivering it.
    /// On by default.
    pub fn verify_diffs(mut self, enabled: bool) -> Self {
        self.verify_diffs = enabled;
        self
    }

    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[inline]
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    #[inline]
    pub fn verifies_diffs(&self) -> bool {
        self.verify_diffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = FetchRequest::new("Task");
        assert_eq!(request.entity(), "Task");
        assert!(!request.sort().is_sectioned());
        assert!(request.sort().primary().is_none());
        assert!(request.verifies_diffs());
        assert!(request.predicate().is_local());
    }

    #[test]
    fn test_request_builder() {
        let request = FetchRequest::new("Task")
            .sort_by("name")
            .section_by("group")
            .filter(Predicate::eq("done", false))
            .verify_diffs(false);
        assert_eq!(request.sort().primary(), Some("name"));
        assert_eq!(request.sort().section(), Some("group"));
        assert!(!request.verifies_diffs());
    }
}
