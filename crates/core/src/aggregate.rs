//! Event-sourced aggregate contracts.
//!
//! Products and sales orders are both rebuilt from their event streams. A
//! command is decided against the rebuilt state (`handle`), and the resulting
//! events are what get stored; state only ever moves through `apply`.

use core::fmt;

/// Identity and revision of a stream-backed aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Count of events applied since [`Aggregate`] rehydration began.
    ///
    /// Equals the stream's last sequence number, which is what an append is
    /// checked against.
    fn version(&self) -> u64;
}

/// Revision a writer expects the stream to be at when it appends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append regardless of the current revision.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must be at exactly this revision.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation for a writer that decided against `version`.
    pub fn from_version(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual == 0,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

impl fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedVersion::Any => f.write_str("any revision"),
            ExpectedVersion::NoStream => f.write_str("no stream"),
            ExpectedVersion::Exact(v) => write!(f, "revision {v}"),
        }
    }
}

/// Decide/evolve pair of an event-sourced model. Implementations do no IO.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + fmt::Debug;
    type Event: Clone + fmt::Debug;
    type Error: fmt::Debug;

    /// Fold one event into state; bumps `version` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Events that `command` produces against current state. Must not mutate.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Fold a whole history in order.
    fn replay<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }
}
