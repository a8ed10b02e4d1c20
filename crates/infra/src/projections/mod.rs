//! Projections: read models built from published events.
//!
//! Projections are rebuildable from the event store and idempotent under
//! at-least-once delivery (duplicates are skipped by sequence number).

pub mod catalog;

pub use catalog::{CatalogEntry, CatalogProjectionError, ProductCatalogProjection};
