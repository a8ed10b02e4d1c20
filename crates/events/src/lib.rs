//! Domain events, commands and their publication mechanics.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::{EventEnvelope, StreamPosition};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
