//! Quiver Database - Controller facade over a record store and a live query.
//!
//! This crate provides the public entry point for applications:
//!
//! - `Controller`: Owns a live query on a shared store, resolves index paths
//!   to records and routes mutations through the store
//! - `init_logging`: Installs log output filtered by `QUIVER_LOG`
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{fields, Record};
//! use quiver_database::{Controller, IndexPath};
//! use quiver_reactive::{FetchRequest, ProjectionMapper};
//! use quiver_storage::{RecordStore, StoreConfig};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let store = Rc::new(RefCell::new(RecordStore::new(
//!     StoreConfig::builder("Task").build().unwrap(),
//! )));
//! let request = FetchRequest::new("Task").sort_by("name").section_by("group");
//! let mapper = ProjectionMapper::new(|r: &Record| r.value("name").to_label());
//! let controller = Controller::new(store, request, mapper).unwrap();
//!
//! controller.add(fields([("name", "a"), ("group", "X")])).unwrap();
//! controller.add(fields([("name", "b"), ("group", "Y")])).unwrap();
//!
//! assert_eq!(controller.number_of_sections(), 2);
//! assert_eq!(controller.item(IndexPath::new(1, 0)).as_deref(), Some("b"));
//! controller.delete_items(&[IndexPath::new(0, 0)]).unwrap();
//! assert_eq!(controller.section_label(0).as_deref(), Some("Y"));
//! ```

pub mod controller;
pub mod logging;

pub use controller::Controller;
pub use logging::init_logging;

// Re-export commonly used types from dependencies
pub use quiver_core::{Error, Result};
pub use quiver_reactive::{ChangeEvent, FetchRequest, IndexPath, ProjectionMapper};
