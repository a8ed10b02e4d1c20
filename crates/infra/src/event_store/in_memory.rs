use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
struct Stream {
    aggregate_type: String,
    events: Vec<StoredEvent>,
}

impl Stream {
    fn revision(&self) -> u64 {
        self.events.len() as u64
    }
}

/// Streams kept in a map behind one lock.
///
/// The version check and the write happen under the same write guard, so of
/// two writers that loaded the same revision only the first commits.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Stream>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams with at least one event.
    pub fn stream_count(&self) -> usize {
        self.streams.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        if let Some(index) = events
            .iter()
            .position(|e| e.aggregate_id != aggregate_id || e.aggregate_type != aggregate_type)
        {
            return Err(EventStoreError::MixedBatch { index });
        }

        let mut streams = self.streams.write().map_err(|_| EventStoreError::Poisoned)?;

        let actual = streams.get(&aggregate_id).map(Stream::revision).unwrap_or(0);
        if !expected_version.matches(actual) {
            return Err(EventStoreError::Concurrency {
                expected: expected_version,
                actual,
            });
        }

        let stream = streams.entry(aggregate_id).or_insert_with(|| Stream {
            aggregate_type: aggregate_type.clone(),
            events: Vec::new(),
        });
        if stream.aggregate_type != aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch {
                stream: stream.aggregate_type.clone(),
                attempted: aggregate_type,
            });
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(actual + 1..)
            .map(|(e, sequence_number)| e.commit(sequence_number))
            .collect();
        stream.events.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(streams
            .get(&aggregate_id)
            .map(|s| s.events.clone())
            .unwrap_or_default())
    }
}
