//! Quiver Core - Shared types for the Quiver observable query engine.
//!
//! This crate provides the foundational types used by every other Quiver crate:
//!
//! - `Value`: Dynamically typed field values with a total order
//! - `Record`: A persisted entity instance with a stable identity
//! - `SortSpec`: Primary and section sort keys of a live query
//! - `Predicate`: Boolean conditions over records
//! - `Error`: Error taxonomy for store, query and bridge operations
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{fields, Predicate, Record, SortSpec, Value};
//!
//! let record = Record::new(1, fields([("name", Value::from("a")), ("group", Value::from("X"))]));
//!
//! let in_x = Predicate::eq("group", "X");
//! assert_eq!(in_x.eval(&record), Ok(true));
//!
//! let spec = SortSpec::new().by("name").sectioned_by("group");
//! assert_eq!(spec.section_value(&record), Value::from("X"));
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod error;
pub mod predicate;
mod record;
mod sort;
mod types;
mod value;

pub use error::{BridgeError, Error, QueryError, Result};
pub use predicate::{EvalType, Predicate, PredicateFn};
pub use record::{fields, Fields, Record, RecordId};
pub use sort::SortSpec;
pub use types::DataType;
pub use value::Value;
