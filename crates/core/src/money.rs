//! Monetary amounts.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::quantity::Quantity;
use crate::value_object::ValueObject;

/// Non-negative decimal amount in the shop currency.
///
/// Serialized as a decimal string (`"9.99"`) so no precision is lost in JSON.
/// Negative amounts are unrepresentable: construction and deserialization both
/// reject them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "amount must not be negative (got {amount})"
            )));
        }
        Ok(Self(amount))
    }

    /// Build from an integer count of minor units, e.g. `from_minor(999, 2)` is 9.99.
    pub fn from_minor(units: u64, scale: u32) -> Self {
        Self(Decimal::from_i128_with_scale(units as i128, scale))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(&self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Price of `quantity` units at this unit price.
    pub fn times(&self, quantity: Quantity) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount = Decimal::from_str(trimmed)
            .map_err(|_| DomainError::validation(format!("'{trimmed}' is not a number")))?;
        Money::new(amount)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Money {}
