//! Fan-out of committed events to read-side consumers.
//!
//! The store is the source of truth; the bus only tells projections that
//! something was committed. Delivery may repeat, so consumers dedupe by
//! `(aggregate_id, sequence_number)`, and a consumer that falls behind
//! rebuilds from the store.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError};

/// Receiving end handed out by [`EventBus::subscribe`]. Sees every message
/// published after it was created, in publish order.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Blocks for the next message. Fails once the bus is gone.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Blocking iterator that ends when the bus is dropped; the shape a
    /// projection worker loop wants.
    pub fn iter(&self) -> impl Iterator<Item = M> + '_ {
        self.receiver.iter()
    }

    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Where the dispatcher announces commits.
///
/// A failed `publish` comes after the append, so the events are stored either
/// way and may be published again.
pub trait EventBus<M>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        B::publish(self, message)
    }

    fn subscribe(&self) -> Subscription<M> {
        B::subscribe(self)
    }
}
