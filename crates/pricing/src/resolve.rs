//! Unit price resolution.

use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Money, Quantity, TierId};

use crate::tier::{PricingTier, PricingTierSet};

/// Price of an order line: which band applied and what it costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
    /// `None` when the base price applied.
    pub tier_id: Option<TierId>,
}

/// Unit price for `quantity`: the matching active tier's price, or
/// `base_price` when no tier matches (including an empty set).
///
/// # Panics
///
/// If the active tiers break the tier invariants (`min >= 1`, `max > min`, no
/// overlaps). Admission through [`crate::validate`] rules that out, so hitting
/// this means validation was bypassed.
pub fn resolve(active_tiers: &PricingTierSet, base_price: Money, quantity: Quantity) -> Money {
    resolve_tier(active_tiers, quantity)
        .map(|tier| tier.unit_price)
        .unwrap_or(base_price)
}

/// The active tier covering `quantity`, if any. Same contract as [`resolve`].
pub fn resolve_tier(active_tiers: &PricingTierSet, quantity: Quantity) -> Option<&PricingTier> {
    let sorted = active_tiers.sorted_active();
    assert_disjoint(&sorted);

    sorted.into_iter().find(|tier| tier.bounds.contains(quantity))
}

/// Resolve and multiply out for an order line.
pub fn quote(
    active_tiers: &PricingTierSet,
    base_price: Money,
    quantity: Quantity,
) -> DomainResult<PriceQuote> {
    let tier = resolve_tier(active_tiers, quantity);
    let unit_price = tier.map(|t| t.unit_price).unwrap_or(base_price);

    Ok(PriceQuote {
        quantity,
        unit_price,
        line_total: unit_price.times(quantity)?,
        tier_id: tier.map(|t| t.tier_id),
    })
}

fn assert_disjoint(sorted: &[&PricingTier]) {
    for tier in sorted {
        assert!(
            tier.bounds.is_well_formed(),
            "pricing tier {} has malformed bounds {}",
            tier.tier_id,
            tier.bounds
        );
    }
    for pair in sorted.windows(2) {
        assert!(
            !pair[0].bounds.overlaps(&pair[1].bounds),
            "pricing tiers {} ({}) and {} ({}) overlap",
            pair[0].tier_id,
            pair[0].bounds,
            pair[1].tier_id,
            pair[1].bounds
        );
    }
}
