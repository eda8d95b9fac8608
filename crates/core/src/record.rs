//! Record structure for Quiver stores.
//!
//! This module defines the `Record` struct which represents a single persisted
//! entity instance.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;
use serde::{Deserialize, Serialize};

/// Unique identifier for a record within one store.
pub type RecordId = u64;

/// Field map of a record, ordered by field name.
pub type Fields = BTreeMap<String, Value>;

/// What a missing field reads as.
static NULL: Value = Value::Null;

/// Builds a field map from `(name, value)` pairs.
///
/// ```rust
/// use quiver_core::{fields, Value};
///
/// let f = fields([("name", Value::from("a")), ("group", Value::from("X"))]);
/// assert_eq!(f.len(), 2);
/// ```
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A persisted entity instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    /// Identity token issued by the owning store.
    id: RecordId,
    /// Version number for change detection. Incremented on each update.
    version: u64,
    /// Field values by name.
    fields: Fields,
}

impl Record {
    /// Creates a new record with the given identity and fields.
    /// Version defaults to 1 for new records.
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self {
            id,
            version: 1,
            fields,
        }
    }

    /// Creates a new record with the given identity, version and fields.
    pub fn new_with_version(id: RecordId, version: u64, fields: Fields) -> Self {
        Self {
            id,
            version,
            fields,
        }
    }

    /// Returns the identity token.
    #[inline]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the version number.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Increments the version number and returns the new value.
    #[inline]
    pub fn increment_version(&mut self) -> u64 {
        self.version = self.version.wrapping_add(1);
        self.version
    }

    /// Returns the field map.
    #[inline]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Returns a mutable reference to the field map.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Gets a field value, None if the field is absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Gets a field value, reading an absent field as `Value::Null`.
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Sets a field value, returning the previous one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version && self.fields == other.fields
    }
}
