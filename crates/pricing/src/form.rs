//! Raw tier input as typed by an administrator.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rejection::TierRejection;

/// Tier fields exactly as submitted: optional strings.
///
/// Blank fields count as absent. An absent `max_quantity` means "no upper
/// bound".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierForm {
    #[serde(default)]
    pub min_quantity: Option<String>,
    #[serde(default)]
    pub max_quantity: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
}

/// Parsed but unvalidated tier fields.
///
/// Values may still break every rule (zero or negative bounds, max below min,
/// negative price); [`crate::validate`] decides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCandidate {
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

impl TierCandidate {
    pub fn new(min_quantity: i64, max_quantity: Option<i64>, unit_price: Decimal) -> Self {
        Self {
            min_quantity: Some(min_quantity),
            max_quantity,
            unit_price: Some(unit_price),
        }
    }
}

impl TierForm {
    /// Syntax check, field by field in min, max, price order.
    ///
    /// Non-integer bounds are `InvalidBound`, non-numeric prices are
    /// `InvalidPrice`. Range and overlap rules are left to validation.
    pub fn parse(&self) -> Result<TierCandidate, TierRejection> {
        Ok(TierCandidate {
            min_quantity: parse_bound("min_quantity", self.min_quantity.as_deref())?,
            max_quantity: parse_bound("max_quantity", self.max_quantity.as_deref())?,
            unit_price: parse_price(self.unit_price.as_deref())?,
        })
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<i64>, TierRejection> {
    present(raw)
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                TierRejection::InvalidBound(format!("{field} must be a whole number (got '{s}')"))
            })
        })
        .transpose()
}

fn parse_price(raw: Option<&str>) -> Result<Option<Decimal>, TierRejection> {
    present(raw)
        .map(|s| {
            Decimal::from_str(s)
                .map_err(|_| TierRejection::InvalidPrice(format!("'{s}' is not a number")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(min: Option<&str>, max: Option<&str>, price: Option<&str>) -> TierForm {
        TierForm {
            min_quantity: min.map(String::from),
            max_quantity: max.map(String::from),
            unit_price: price.map(String::from),
        }
    }

    #[test]
    fn parses_well_formed_input() {
        let c = form(Some(" 10 "), Some("49"), Some("8.50")).parse().unwrap();
        assert_eq!(c, TierCandidate::new(10, Some(49), Decimal::new(850, 2)));
    }

    #[test]
    fn blank_max_means_unbounded() {
        let c = form(Some("50"), Some("   "), Some("7")).parse().unwrap();
        assert_eq!(c.max_quantity, None);
    }

    #[test]
    fn blank_required_fields_stay_absent_for_validation() {
        let c = form(Some(""), None, None).parse().unwrap();
        assert_eq!(c, TierCandidate::default());
    }

    #[test]
    fn non_integer_bounds_are_invalid_bounds() {
        for raw in ["ten", "2.5", "1e3"] {
            let err = form(Some(raw), None, Some("1")).parse().unwrap_err();
            assert_eq!(err.code(), "invalid_bound", "input {raw}");
        }
        let err = form(Some("1"), Some("lots"), Some("1")).parse().unwrap_err();
        assert!(matches!(err, TierRejection::InvalidBound(msg) if msg.contains("max_quantity")));
    }

    #[test]
    fn non_numeric_price_is_invalid_price() {
        let err = form(Some("1"), None, Some("free")).parse().unwrap_err();
        assert_eq!(err, TierRejection::InvalidPrice("'free' is not a number".into()));
    }

    #[test]
    fn negative_values_parse_and_are_left_to_validation() {
        let c = form(Some("-1"), Some("0"), Some("-2.00")).parse().unwrap();
        assert_eq!(c.min_quantity, Some(-1));
        assert_eq!(c.max_quantity, Some(0));
        assert!(c.unit_price.unwrap().is_sign_negative());
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let f: TierForm = serde_json::from_str(r#"{"min_quantity":"5"}"#).unwrap();
        assert_eq!(f.min_quantity.as_deref(), Some("5"));
        assert_eq!(f.max_quantity, None);
        assert_eq!(f.unit_price, None);
    }
}
