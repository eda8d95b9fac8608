//! Projection from records to presentation values.
//!
//! A mapper must be total and pure: it builds the view entirely from the
//! record snapshot it is handed and never touches the store. A record the
//! mapper cannot handle is a caller bug, so mappers panic rather than return
//! errors.

use quiver_core::Record;
use std::fmt;
use std::rc::Rc;

/// Types that can be built from a record snapshot.
pub trait FromRecord {
    fn from_record(record: &Record) -> Self;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> Self {
        record.clone()
    }
}

/// Converts records into views of type `V`.
pub struct ProjectionMapper<V> {
    map: Rc<dyn Fn(&Record) -> V>,
}

impl<V> ProjectionMapper<V> {
    /// Wraps a mapping closure.
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(&Record) -> V + 'static,
    {
        Self { map: Rc::new(map) }
    }

    /// Maps one record.
    #[inline]
    pub fn map(&self, record: &Record) -> V {
        (self.map)(record)
    }
}

impl<V: FromRecord + 'static> ProjectionMapper<V> {
    /// Mapper that uses `V`'s `FromRecord` implementation.
    pub fn from_record() -> Self {
        Self::new(V::from_record)
    }
}

impl<V> Clone for ProjectionMapper<V> {
    fn clone(&self) -> Self {
        Self {
            map: Rc::clone(&self.map),
        }
    }
}

impl<V> fmt::Debug for ProjectionMapper<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProjectionMapper(..)")
    }
}
