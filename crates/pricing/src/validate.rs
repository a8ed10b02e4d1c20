//! Tier admission.

use storefront_core::Money;

use crate::form::TierCandidate;
use crate::rejection::TierRejection;
use crate::tier::{PricingTier, PricingTierSet, TierBounds};

/// A candidate that passed every check; ready to become a [`PricingTier`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AdmittedTier {
    pub bounds: TierBounds,
    pub unit_price: Money,
}

/// Decide whether `candidate` may join the active tiers of `existing`.
///
/// `existing` is assumed to be valid already; only the candidate is checked,
/// on its own and against each active tier. Checks run in order and stop at
/// the first failure:
///
/// 1. `min_quantity` present and at least 1
/// 2. `max_quantity`, when present, greater than `min_quantity`
/// 3. `unit_price` present and not negative
/// 4. no overlap with an active tier
pub fn validate(
    existing: &PricingTierSet,
    candidate: &TierCandidate,
) -> Result<AdmittedTier, TierRejection> {
    validate_against(existing.active(), candidate)
}

/// [`validate`] over an explicit list of active tiers.
///
/// Used when the comparison set is not a whole [`PricingTierSet`], e.g. a
/// replacement is checked against the active tiers minus the one it replaces.
pub fn validate_against<'a>(
    active: impl IntoIterator<Item = &'a PricingTier>,
    candidate: &TierCandidate,
) -> Result<AdmittedTier, TierRejection> {
    let result = admit(active, candidate);
    if let Err(rejection) = &result {
        tracing::debug!(code = rejection.code(), %rejection, "pricing tier rejected");
    }
    result
}

fn admit<'a>(
    active: impl IntoIterator<Item = &'a PricingTier>,
    candidate: &TierCandidate,
) -> Result<AdmittedTier, TierRejection> {
    let min = candidate
        .min_quantity
        .ok_or(TierRejection::MissingRequiredField("min_quantity"))?;
    if min < 1 {
        return Err(TierRejection::InvalidBound(format!(
            "min_quantity must be at least 1 (got {min})"
        )));
    }

    if let Some(max) = candidate.max_quantity {
        if max <= min {
            return Err(TierRejection::InvalidBound(format!(
                "max_quantity must be greater than min_quantity (got {min}-{max})"
            )));
        }
    }

    let price = candidate
        .unit_price
        .ok_or(TierRejection::MissingRequiredField("unit_price"))?;
    let unit_price = Money::new(price)
        .map_err(|_| TierRejection::InvalidPrice(format!("must not be negative (got {price})")))?;

    // Both bounds are >= 1 here, so the conversions are lossless.
    let bounds = TierBounds::new(min as u64, candidate.max_quantity.map(|max| max as u64));

    if let Some(clash) = active.into_iter().find(|t| t.bounds.overlaps(&bounds)) {
        return Err(TierRejection::OverlappingRange {
            candidate: bounds,
            existing: clash.bounds,
            existing_id: clash.tier_id,
        });
    }

    Ok(AdmittedTier { bounds, unit_price })
}

/// Check a whole tier collection: every active tier well-formed, no two active
/// tiers overlapping. Returns the first violation found.
pub fn validate_set(set: &PricingTierSet) -> Result<(), TierRejection> {
    let sorted = set.sorted_active();

    for tier in &sorted {
        if !tier.bounds.is_well_formed() {
            return Err(TierRejection::InvalidBound(format!(
                "tier {} has malformed bounds {}",
                tier.tier_id, tier.bounds
            )));
        }
    }

    // Sorted by min, so any overlap shows up between neighbours.
    for pair in sorted.windows(2) {
        if pair[0].bounds.overlaps(&pair[1].bounds) {
            return Err(TierRejection::OverlappingRange {
                candidate: pair[1].bounds,
                existing: pair[0].bounds,
                existing_id: pair[0].tier_id,
            });
        }
    }

    Ok(())
}
