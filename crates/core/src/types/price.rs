//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as [`Decimal`] in memory but serialized as plain JSON
//! numbers, so a persisted cart stays an array of primitive-valued records.
//!
//! A JSON number is read back as an `f64`, so every constructor narrows the
//! amount to what survives that round trip: at most [`MAX_DECIMAL_PLACES`]
//! decimal places and the precision of an `f64`. A price read from a snapshot
//! therefore always equals the price that was written.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept by a [`Price`].
///
/// Keeps the shortest `f64` form of any price within `Decimal`'s scale.
const MAX_DECIMAL_PLACES: u32 = 12;

/// Unit price of a product, in the store's currency.
///
/// No currency is attached; the cart never computes totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "json_number")] Decimal);

impl Price {
    /// Create a new price, narrowed to JSON number precision.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(narrow(amount))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self::new)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// JSON number conversion
// =============================================================================

fn to_f64(amount: Decimal) -> f64 {
    // A decimal's display form is always a valid f64 literal
    amount.to_string().parse().unwrap_or_default()
}

fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Narrow `amount` to a value that serializes and parses back unchanged.
fn narrow(amount: Decimal) -> Decimal {
    let rounded = amount.round_dp(MAX_DECIMAL_PLACES);
    from_f64(to_f64(rounded)).map_or(rounded, |d| d.round_dp(MAX_DECIMAL_PLACES))
}

mod json_number {
    use rust_decimal::Decimal;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::to_f64(*amount))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let value = f64::deserialize(deserializer)?;
        super::from_f64(value)
            .map(super::narrow)
            .ok_or_else(|| D::Error::custom(format!("price {value} is out of range")))
    }
}
