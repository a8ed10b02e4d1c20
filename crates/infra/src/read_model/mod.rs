//! Disposable read model storage. Everything here can be rebuilt from the
//! event store.

pub mod store;

pub use store::{InMemoryReadStore, ReadStore};
