use chrono::{DateTime, Utc};

/// Something that happened to an aggregate. Stored once, never edited.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name such as `products.pricing_tier.added`; stored next to the
    /// payload and shown in the audit trail.
    fn event_type(&self) -> &'static str;

    /// Payload schema revision of this event type.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
