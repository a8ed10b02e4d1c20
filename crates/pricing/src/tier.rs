use serde::{Deserialize, Serialize};

use storefront_core::{Entity, Money, Quantity, TierId};

use crate::validate::AdmittedTier;

/// Inclusive quantity band `[min_quantity, max_quantity]`.
///
/// An absent `max_quantity` means the band is unbounded above. That is the only
/// encoding of "no upper bound"; there are no sentinel values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierBounds {
    pub min_quantity: u64,
    pub max_quantity: Option<u64>,
}

impl TierBounds {
    pub fn new(min_quantity: u64, max_quantity: Option<u64>) -> Self {
        Self {
            min_quantity,
            max_quantity,
        }
    }

    /// Upper bound with "unbounded" mapped to `u64::MAX`.
    pub fn upper(&self) -> u64 {
        self.max_quantity.unwrap_or(u64::MAX)
    }

    /// Whether `quantity` falls inside the band (both ends inclusive).
    pub fn contains(&self, quantity: Quantity) -> bool {
        let q = quantity.get();
        self.min_quantity <= q && q <= self.upper()
    }

    /// Whether the two bands share at least one quantity.
    pub fn overlaps(&self, other: &TierBounds) -> bool {
        self.min_quantity <= other.upper() && other.min_quantity <= self.upper()
    }

    /// Bounds satisfy `min >= 1` and `max > min`.
    pub fn is_well_formed(&self) -> bool {
        self.min_quantity >= 1
            && self
                .max_quantity
                .is_none_or(|max| max > self.min_quantity)
    }
}

impl core::fmt::Display for TierBounds {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.max_quantity {
            Some(max) => write!(f, "{}-{}", self.min_quantity, max),
            None => write!(f, "{}+", self.min_quantity),
        }
    }
}

/// One quantity band of a product and the unit price charged inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTier {
    pub tier_id: TierId,
    #[serde(flatten)]
    pub bounds: TierBounds,
    pub unit_price: Money,
    pub active: bool,
}

impl PricingTier {
    /// Build an active tier from a candidate that passed validation.
    pub fn new(tier_id: TierId, admitted: AdmittedTier) -> Self {
        Self {
            tier_id,
            bounds: admitted.bounds,
            unit_price: admitted.unit_price,
            active: true,
        }
    }
}

impl Entity for PricingTier {
    type Id = TierId;

    fn id(&self) -> &Self::Id {
        &self.tier_id
    }
}

/// The pricing tiers of one product.
///
/// Stored in admission order, inactive tiers included. Only the active subset
/// takes part in validation and resolution, and resolution always reads it
/// through [`PricingTierSet::sorted_active`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTierSet {
    tiers: Vec<PricingTier>,
}

impl PricingTierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap tiers loaded from elsewhere. No checks are made here; the resolver
    /// asserts the invariants before using them.
    pub fn from_tiers(tiers: Vec<PricingTier>) -> Self {
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricingTier> {
        self.tiers.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &PricingTier> {
        self.tiers.iter().filter(|t| t.active)
    }

    /// Active tiers, ascending by `min_quantity` (stable).
    pub fn sorted_active(&self) -> Vec<&PricingTier> {
        let mut active: Vec<&PricingTier> = self.active().collect();
        active.sort_by_key(|t| t.bounds.min_quantity);
        active
    }

    pub fn get(&self, tier_id: TierId) -> Option<&PricingTier> {
        self.tiers.iter().find(|t| t.has_id(&tier_id))
    }

    /// Append a tier. Callers validate first.
    pub fn insert(&mut self, tier: PricingTier) {
        self.tiers.push(tier);
    }

    pub fn remove(&mut self, tier_id: TierId) -> Option<PricingTier> {
        let idx = self.tiers.iter().position(|t| t.has_id(&tier_id))?;
        Some(self.tiers.remove(idx))
    }

    /// Flip the `active` flag. Returns `false` when the tier is unknown.
    pub fn set_active(&mut self, tier_id: TierId, active: bool) -> bool {
        match self.tiers.iter_mut().find(|t| t.has_id(&tier_id)) {
            Some(tier) => {
                tier.active = active;
                true
            }
            None => false,
        }
    }
}

impl FromIterator<PricingTier> for PricingTierSet {
    fn from_iter<I: IntoIterator<Item = PricingTier>>(iter: I) -> Self {
        Self {
            tiers: iter.into_iter().collect(),
        }
    }
}
