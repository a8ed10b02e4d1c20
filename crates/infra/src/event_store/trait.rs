use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use storefront_core::{AggregateId, ExpectedVersion};
use storefront_events::{Event, EventEnvelope, StreamPosition};

/// A decided event on its way into a stream. The store numbers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Serialize a typed product or order event for appending.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| EventStoreError::Serialize {
            event_type: event.event_type(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    /// Stamp with the position the store assigned.
    pub fn commit(self, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            sequence_number,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// An event as it sits in a stream. `sequence_number` starts at 1 and has no
/// gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    pub sequence_number: u64,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn position(&self) -> StreamPosition {
        StreamPosition {
            aggregate_id: self.aggregate_id,
            sequence_number: self.sequence_number,
        }
    }

    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.event_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer appended since the caller loaded the stream.
    #[error("stream moved on: expected {expected}, stream is at revision {actual}")]
    Concurrency { expected: ExpectedVersion, actual: u64 },

    #[error("stream holds '{stream}' events, refused '{attempted}'")]
    AggregateTypeMismatch { stream: String, attempted: String },

    /// A batch must target a single stream.
    #[error("batch spans more than one stream (event {index})")]
    MixedBatch { index: usize },

    #[error("failed to serialize {event_type}: {reason}")]
    Serialize { event_type: &'static str, reason: String },

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Append-only storage of product and order streams.
///
/// An append writes the whole batch or nothing, after checking
/// `expected_version` against the stream's current revision. Sequence numbers
/// continue from that revision without gaps.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// The stream in sequence order; empty for an unknown id.
    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        S::append(self, events, expected_version)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        S::load_stream(self, aggregate_id)
    }
}
