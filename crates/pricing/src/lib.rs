//! Quantity-based pricing tiers.
//!
//! Two pure operations over one data model:
//!
//! - [`validate`] decides whether a candidate tier may join a product's active
//!   tiers (well-formed bounds, non-negative price, no overlap).
//! - [`resolve`] picks the unit price for an order quantity, falling back to
//!   the product's base price when no tier matches.
//!
//! Both use [`TierBounds::contains`], [`TierBounds::overlaps`] and
//! [`PricingTierSet::sorted_active`], so admission and resolution cannot
//! disagree about what a band covers.
//!
//! Nothing here performs IO. Persistence, locking and presentation are the
//! caller's business.

pub mod form;
pub mod rejection;
pub mod resolve;
pub mod tier;
pub mod validate;

pub use form::{TierCandidate, TierForm};
pub use rejection::TierRejection;
pub use resolve::{PriceQuote, quote, resolve, resolve_tier};
pub use tier::{PricingTier, PricingTierSet, TierBounds};
pub use validate::{AdmittedTier, validate, validate_against, validate_set};
