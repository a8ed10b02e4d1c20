//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (validation, invariants, conflicts,
/// rule rejections). Storage and transport failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, such as a zero quantity.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The product, order or tier does not exist.
    #[error("not found")]
    NotFound,

    /// The command clashes with current state (already created, already
    /// active). Retrying the same command cannot succeed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A business rule rejected the input.
    ///
    /// `code` is a stable machine-readable identifier; `reason` is shown to the
    /// administrator verbatim.
    #[error("{reason}")]
    Rejected { code: &'static str, reason: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn rejected(code: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            reason: reason.into(),
        }
    }

    /// Machine-readable kind, for logs and API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidId(_) => "invalid_id",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Rejected { code, .. } => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_reason_verbatim() {
        let err = DomainError::rejected("overlapping_range", "tier 40-60 overlaps 10-50");
        assert_eq!(err.to_string(), "tier 40-60 overlaps 10-50");
    }

    #[test]
    fn rejections_report_their_own_code() {
        assert_eq!(DomainError::rejected("invalid_bound", "x").code(), "invalid_bound");
        assert_eq!(DomainError::not_found().code(), "not_found");
        assert_eq!(DomainError::conflict("tier is already active").code(), "conflict");
    }

    #[test]
    fn validation_is_prefixed() {
        let err = DomainError::validation("quantity must be at least 1");
        assert_eq!(err.to_string(), "validation failed: quantity must be at least 1");
    }
}
