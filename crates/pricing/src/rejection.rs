use thiserror::Error;

use storefront_core::{DomainError, TierId};

use crate::tier::TierBounds;

/// Why a candidate tier was not admitted.
///
/// These are deterministic input errors: the administrator corrects the input
/// and resubmits. The `Display` text is meant to be shown as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TierRejection {
    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    #[error("invalid quantity bound: {0}")]
    InvalidBound(String),

    #[error("invalid unit price: {0}")]
    InvalidPrice(String),

    #[error("quantity range {candidate} overlaps existing tier {existing}")]
    OverlappingRange {
        candidate: TierBounds,
        existing: TierBounds,
        existing_id: TierId,
    },
}

impl TierRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TierRejection::MissingRequiredField(_) => "missing_required_field",
            TierRejection::InvalidBound(_) => "invalid_bound",
            TierRejection::InvalidPrice(_) => "invalid_price",
            TierRejection::OverlappingRange { .. } => "overlapping_range",
        }
    }
}

impl From<TierRejection> for DomainError {
    fn from(value: TierRejection) -> Self {
        DomainError::rejected(value.code(), value.to_string())
    }
}
