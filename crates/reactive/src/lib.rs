//! Quiver Reactive - Live queries for the Quiver observable query engine.
//!
//! A live query keeps a sectioned, sorted projection of the records in a
//! `RecordStore` and tells its subscribers, change by change, how that
//! projection moves. Presentation layers replay the change scripts instead of
//! reloading.
//!
//! # Core Concepts
//!
//! - `FetchRequest`: Entity, filter predicate, sort and section keys
//! - `LiveQuery`: The live projection, attached to a store as an observer
//! - `Projection`: Ordered sections of record snapshots
//! - `ChangeEvent`: One step of a diff script, addressed by `IndexPath`
//! - `ChangeBridge`: Checks scripts against the projection and delivers them
//! - `Subscription`: `will_change` / `on_change` / `did_change` callbacks
//! - `ProjectionMapper`: Turns record snapshots into presentation values
//!
//! # Script ordering
//!
//! Deletes, move sources and updates use indices from before the change;
//! inserts and move destinations use indices from after it. Events come in
//! the order row deletes (descending), section deletes (descending), section
//! inserts (ascending), row inserts (ascending), moves, updates.

pub mod bridge;
pub mod change_event;
pub mod diff;
pub mod live_query;
pub mod mapper;
pub mod projection;
pub mod request;
pub mod subscription;

pub use bridge::ChangeBridge;
pub use change_event::{ChangeEvent, IndexPath};
pub use live_query::LiveQuery;
pub use mapper::{FromRecord, ProjectionMapper};
pub use projection::{Projection, Section, Shape};
pub use request::FetchRequest;
pub use subscription::{ChangeCallback, Subscription, SubscriptionId, SubscriptionManager, UpdateCallback};
