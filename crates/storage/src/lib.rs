//! Quiver Storage - Record store for the Quiver observable query engine.
//!
//! This crate provides the storage layer including:
//!
//! - `RecordStore`: Records of one entity kind with stable identities
//! - `StoreConfig`: Store configuration and its builder
//! - `RecordChange`: Mutation notifications delivered to observers
//! - `StoreObserver`: The seam live queries plug into
//! - `Medium`: Backing media for checkpoints (`FileMedium`, `MemoryMedium`)
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{fields, Value};
//! use quiver_storage::{RecordStore, StoreConfig};
//!
//! let config = StoreConfig::builder("Task").build().unwrap();
//! let mut store = RecordStore::new(config);
//!
//! let id = store.insert(fields([("name", Value::from("a"))])).unwrap();
//! store.update(id, |f| { f.insert("done".into(), Value::Boolean(true)); }).unwrap();
//! store.checkpoint().unwrap();
//!
//! assert_eq!(store.get(id).unwrap().version(), 2);
//! assert!(!store.has_changes());
//! ```

pub mod change;
pub mod config;
pub mod medium;
pub mod observer;
pub mod snapshot;
pub mod store;

pub use change::{ChangeKind, RecordChange};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use medium::{FileMedium, Medium, MemoryMedium};
pub use observer::{ObserverId, ObserverRegistry, SharedObserver, StoreObserver};
pub use snapshot::Snapshot;
pub use store::RecordStore;
