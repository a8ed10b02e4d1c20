//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing with the given output format.
///
/// Safe to call multiple times; later calls are no-ops and return `false`.
pub fn init(format: LogFormat) -> bool {
    tracing::init(format)
}
