//! Change events delivered to live query subscribers.

use core::fmt;

/// Address of one row: `(section, row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    #[inline]
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl From<(usize, usize)> for IndexPath {
    fn from((section, row): (usize, usize)) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.row)
    }
}

/// One step of a diff script.
///
/// Deletes, move sources and updates address the projection before the
/// change; inserts and move destinations address it after the change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    RowInsert(IndexPath),
    RowDelete(IndexPath),
    RowUpdate(IndexPath),
    RowMove(IndexPath, IndexPath),
    SectionInsert(usize),
    SectionDelete(usize),
}

impl ChangeEvent {
    /// Position of this event kind in the canonical script order.
    pub(crate) fn phase(&self) -> u8 {
        match self {
            ChangeEvent::RowDelete(_) => 0,
            ChangeEvent::SectionDelete(_) => 1,
            ChangeEvent::SectionInsert(_) => 2,
            ChangeEvent::RowInsert(_) => 3,
            ChangeEvent::RowMove(..) => 4,
            ChangeEvent::RowUpdate(_) => 5,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::RowInsert(p) => write!(f, "row insert {}", p),
            ChangeEvent::RowDelete(p) => write!(f, "row delete {}", p),
            ChangeEvent::RowUpdate(p) => write!(f, "row update {}", p),
            ChangeEvent::RowMove(from, to) => write!(f, "row move {} -> {}", from, to),
            ChangeEvent::SectionInsert(s) => write!(f, "section insert {}", s),
            ChangeEvent::SectionDelete(s) => write!(f, "section delete {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path_ordering() {
        assert!(IndexPath::new(0, 5) < IndexPath::new(1, 0));
        assert!(IndexPath::new(1, 0) < IndexPath::new(1, 1));
        assert_eq!(IndexPath::from((2, 3)), IndexPath::new(2, 3));
    }

    #[test]
    fn test_event_display() {
        let event = ChangeEvent::RowMove(IndexPath::new(0, 1), IndexPath::new(2, 0));
        assert_eq!(event.to_string(), "row move (0, 1) -> (2, 0)");
        assert_eq!(ChangeEvent::SectionDelete(3).to_string(), "section delete 3");
    }
}
