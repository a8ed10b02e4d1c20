//! Values compared by content.

/// Immutable value with no identity of its own (`Money`, `Quantity`).
///
/// Equal contents mean equal values; arithmetic produces new values.
pub trait ValueObject: Copy + Eq + core::fmt::Debug + core::fmt::Display {}
