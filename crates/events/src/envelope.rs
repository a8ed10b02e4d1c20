use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::AggregateId;

/// Where an event sits: its stream and its 1-based position in that stream.
///
/// Ordered by stream, then position, which is the replay order a projection
/// rebuild needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamPosition {
    pub aggregate_id: AggregateId,
    pub sequence_number: u64,
}

impl StreamPosition {
    /// Whether this position directly follows `last` in the same stream.
    pub fn follows(&self, last: u64) -> bool {
        self.sequence_number == last + 1
    }
}

/// A committed event as published on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    position: StreamPosition,
    aggregate_type: String,
    event_type: String,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            position: StreamPosition {
                aggregate_id,
                sequence_number,
            },
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn position(&self) -> StreamPosition {
        self.position
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.position.aggregate_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.position.sequence_number
    }

    /// Whether the event belongs to a stream of `aggregate_type`.
    pub fn is_for(&self, aggregate_type: &str) -> bool {
        self.aggregate_type == aggregate_type
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
