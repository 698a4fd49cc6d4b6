//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Both types serialize as decimal strings so no precision is lost on the wire.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Upper bound on order prices and quantities. Keeps every sum the engine
/// forms (level totals, fills) far below `Decimal::MAX`.
const ORDER_VALUE_BOUND: u64 = 1_000_000_000_000_000;

/// Limit or execution price
///
/// The type itself accepts any decimal; positivity is an order-level rule
/// enforced at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest price an order may carry
    pub fn upper_bound() -> Self {
        Self(Decimal::from(ORDER_VALUE_BOUND))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse from a decimal string such as "30000.5"
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s).map(Self)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Order or trade quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Largest quantity an order may carry
    pub fn upper_bound() -> Self {
        Self(Decimal::from(ORDER_VALUE_BOUND))
    }

    /// Create a quantity, returning None if negative
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse from a decimal string such as "0.015"
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Add, saturating at the largest representable quantity
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Subtract, saturating at zero
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self::try_new(self.0 - rhs.0).unwrap_or(Self::zero())
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_ordering() {
        assert!(Price::from_str("30000.5").unwrap() > Price::from_u64(30000));
        assert!(Price::from_u64(30001) > Price::from_str("30000.5").unwrap());
    }

    #[test]
    fn test_price_equality_ignores_scale() {
        assert_eq!(Price::from_str("100.0").unwrap(), Price::from_u64(100));
    }

    #[test]
    fn test_quantity_arithmetic_is_exact() {
        let a = Quantity::from_str("0.015").unwrap();
        let b = Quantity::from_str("0.01").unwrap();
        assert_eq!(a - b, Quantity::from_str("0.005").unwrap());
        assert_eq!(b + b, Quantity::from_str("0.02").unwrap());
    }

    #[test]
    fn test_quantity_saturating_sub() {
        let a = Quantity::from_u64(3);
        let b = Quantity::from_u64(5);
        assert_eq!(a.saturating_sub(b), Quantity::zero());
        assert_eq!(b.saturating_sub(a), Quantity::from_u64(2));
    }

    #[test]
    fn test_saturating_add_stops_at_max() {
        let huge = Quantity::from_str("50000000000000000000000000000").unwrap();
        assert_eq!(huge.saturating_add(huge), Quantity::try_new(Decimal::MAX).unwrap());
        assert_eq!(
            Quantity::from_u64(2).saturating_add(Quantity::from_u64(3)),
            Quantity::from_u64(5)
        );
    }

    #[test]
    fn test_upper_bounds() {
        assert_eq!(Quantity::upper_bound(), Quantity::from_u64(1_000_000_000_000_000));
        assert_eq!(Price::upper_bound(), Price::from_u64(1_000_000_000_000_000));
    }

    #[test]
    fn test_quantity_try_new_rejects_negative() {
        assert!(Quantity::try_new(Decimal::from(-1)).is_none());
        assert!(Quantity::try_new(Decimal::ZERO).is_some());
    }

    #[test]
    fn test_serializes_as_string() {
        let price = Price::from_str("30000.5").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"30000.5\"");

        let qty: Quantity = serde_json::from_str("\"0.005\"").unwrap();
        assert_eq!(qty, Quantity::from_str("0.005").unwrap());
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Quantity::from_str("0.0050").unwrap().to_string(), "0.005");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_fill_arithmetic_round_trips(a in 0u64..1_000_000, b in 0u64..1_000_000, scale in 0u32..8) {
                let a = Quantity::try_new(Decimal::new(a as i64, scale)).unwrap();
                let b = Quantity::try_new(Decimal::new(b as i64, scale)).unwrap();
                prop_assert_eq!((a + b) - b, a);
                prop_assert!(a.saturating_sub(b) <= a);
            }
        }
    }
}
