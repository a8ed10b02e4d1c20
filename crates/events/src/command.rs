use storefront_core::AggregateId;

/// A command targets exactly one aggregate.
///
/// Commands are transient intent ("add a 10-49 band at 8.50"); the aggregate
/// either rejects them or turns them into events, which are what gets stored.
/// One command never spans two aggregates, so two commands for different
/// products can run concurrently without coordination.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
