//! Identifiers for streams and for tiers inside a product.
//!
//! Both are time-ordered UUIDv7 values, so sorting by id follows creation
//! order.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|_| DomainError::invalid_id(format!("'{s}' is not a valid {}", $what)))
            }
        }
    };
}

uuid_id!(
    /// Stream identity of a product or a sales order.
    AggregateId,
    "product or order id"
);

uuid_id!(
    /// Identity of one pricing tier within its product.
    TierId,
    "tier id"
);
