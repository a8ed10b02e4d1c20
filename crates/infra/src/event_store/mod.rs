//! Append-only event store boundary.
//!
//! One stream per aggregate instance. Appends carry an optimistic concurrency
//! expectation; the store assigns sequence numbers.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
