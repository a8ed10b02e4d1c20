//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the aggregate's stream
//!   ↓
//! 2. Rehydrate (apply history in sequence order)
//!   ↓
//! 3. Handle the command (pure decision, produces events)
//!   ↓
//! 4. Append expecting the revision seen in step 2
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! Step 4 is what keeps tier admission sound under concurrent edits: a command
//! decided against a snapshot that another writer has since extended fails the
//! append. [`CommandDispatcher::dispatch`] then reloads and decides again, so
//! the second writer is validated against the tiers the first one added.
//!
//! No IO happens here; the store and bus are injected.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use storefront_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use storefront_events::{Command, Event, EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Attempts made by [`CommandDispatcher::dispatch`] before a concurrency
/// failure is returned to the caller.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure that survived every retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// The command clashes with current state (duplicate id, repeated
    /// transition).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input that never reached a business rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A business rule turned the command down; `code` is stable.
    #[error("{reason}")]
    Rejected { code: &'static str, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found")]
    NotFound,

    /// A stored payload could not be read back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    /// The loaded stream is out of order or belongs to another aggregate.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error(transparent)]
    Store(EventStoreError),

    /// Publication failed after a successful append. The events are stored;
    /// republishing is safe.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl DispatchError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, DispatchError::Concurrency(_))
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            err @ EventStoreError::Concurrency { .. } => DispatchError::Concurrency(err.to_string()),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::Rejected { code, reason } => DispatchError::Rejected { code, reason },
        }
    }
}

/// Loads, decides, appends and publishes commands for any aggregate type.
///
/// `S` and `B` are the injected store and bus; tests and the API both run
/// against [`crate::event_store::InMemoryEventStore`] and
/// [`storefront_events::InMemoryEventBus`].
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    max_attempts: u32,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override how many times [`Self::dispatch`] retries after losing an
    /// append race. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `command` against the current state of its target aggregate.
    ///
    /// The aggregate is rehydrated from the store on every attempt. If the
    /// append loses a race, the command is decided again against the fresher
    /// state, up to the configured number of attempts. Domain rejections are
    /// never retried.
    ///
    /// Returns the committed events, which is empty when the command was a
    /// no-op.
    pub fn dispatch<A>(
        &self,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Command: Command,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let aggregate_id = command.target_aggregate_id();
        let mut attempt = 1;
        loop {
            let aggregate = self.load(aggregate_id, &make_aggregate)?;
            match self.execute(&aggregate, aggregate_id, aggregate_type, &command) {
                Err(err) if err.is_concurrency() && attempt < self.max_attempts => {
                    tracing::debug!(
                        %aggregate_id,
                        aggregate_type,
                        attempt,
                        "append lost a race; reloading"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Decide `command` against an already-loaded `aggregate` and append at
    /// exactly the version it was loaded at.
    ///
    /// No retry: if the stream moved on since `aggregate` was loaded, this
    /// fails with [`DispatchError::Concurrency`].
    pub fn execute<A>(
        &self,
        aggregate: &A,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize,
    {
        let decided = match aggregate.handle(command) {
            Ok(events) => events,
            Err(err) => {
                tracing::info!(
                    %aggregate_id,
                    aggregate_type,
                    code = err.code(),
                    reason = %err,
                    "command refused"
                );
                return Err(err.into());
            }
        };
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self
            .store
            .append(uncommitted, ExpectedVersion::from_version(aggregate.version()))?;

        for stored in &committed {
            tracing::info!(
                %aggregate_id,
                aggregate_type,
                event_type = %stored.event_type,
                sequence_number = stored.sequence_number,
                "event committed"
            );
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(e.to_string()))?;
        }

        Ok(committed)
    }

    /// Rehydrate an aggregate from its stream without running a command.
    ///
    /// An unknown id yields the fresh instance from `make_aggregate`; callers
    /// decide whether "not created" is an error.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Raw stream of an aggregate, in sequence order.
    pub fn history(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, DispatchError> {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        Ok(history)
    }
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::CorruptStream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::CorruptStream(format!(
                "non-monotonic sequence_number (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Already checked to be strictly increasing.
    let events = history
        .iter()
        .map(|stored| {
            serde_json::from_value::<A::Event>(stored.payload.clone())
                .map_err(|e| DispatchError::Deserialize(format!("{} #{}: {e}", stored.event_type, stored.sequence_number)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    aggregate.replay(&events);
    Ok(())
}
