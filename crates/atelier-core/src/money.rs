//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Volume of 1500 × 730 × 500 mm at 1500 per m³:                          │
//! │    0.5475 m³ × 1500 = 821.25                                           │
//! │                                                                         │
//! │  In f64, 0.5475 is 0.54749999999999998667...                            │
//! │    → a price that lands exactly on .5 can round the wrong way          │
//! │                                                                         │
//! │  OUR SOLUTION: Base-10 Decimal                                          │
//! │    volumes are exact (integer mm³ with scale 9)                        │
//! │    prices are exact until the single, explicit rounding step           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use atelier_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let drawer = Money::from_units(45);
//! let three = drawer.checked_mul_quantity(3);
//! assert_eq!(three, Some(Money::from_units(135)));
//!
//! let base = Money::from_decimal(Decimal::new(82125, 2)); // 821.25
//! assert_eq!(base.round_to_units(), Some(821));
//!
//! // Arithmetic never panics; overflow is reported as `None`
//! assert_eq!(Money::from_decimal(Decimal::MAX).checked_add(drawer), None);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the single shop currency.
///
/// ## Design Decisions
/// - **Decimal**: exact base-10 arithmetic, serialized as a string
/// - **Single field tuple struct**: zero-cost wrapper
/// - **One rounding point**: [`Money::round_to_units`], half away from zero
/// - **Checked arithmetic only**: no operator can panic on overflow
///
/// Exported to TypeScript as `string` (`#[ts(type = "string")]` on fields).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates a Money value from an exact decimal.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Returns the exact decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiplies a unit price by a quantity. `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::Money;
    ///
    /// let rail = Money::from_units(30);
    /// assert_eq!(rail.checked_mul_quantity(2), Some(Money::from_units(60)));
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(qty)).map(Money)
    }

    /// Multiplies by a decimal factor (volume × price per m³).
    #[inline]
    pub fn checked_mul(&self, factor: Decimal) -> Option<Self> {
        self.0.checked_mul(factor).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Rounds to whole currency units, half away from zero.
    ///
    /// ## Rounding Explained
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  ROUND HALF AWAY FROM ZERO                                          │
    /// │                                                                     │
    /// │    821.25 → 821      821.5 → 822      821.75 → 822                 │
    /// │   -821.5 → -822     (symmetric around zero)                        │
    /// │                                                                     │
    /// │  The same rule is applied in the UI preview, the admin catalog     │
    /// │  and order totals, so a quote never differs between them.          │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// `None` when the rounded amount does not fit an `i64`.
    pub fn round_to_units(&self) -> Option<i64> {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the exact amount with two decimals (for debugging and CLI output).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let money = Money::from_units(1500);
        assert_eq!(money.amount(), Decimal::from(1500));
        assert!(money.is_positive());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_decimal(Decimal::new(82125, 2)).to_string(), "821.25");
        assert_eq!(Money::from_units(5).to_string(), "5.00");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(Money::from_decimal(Decimal::new(82125, 2)).round_to_units(), Some(821));
        assert_eq!(Money::from_decimal(Decimal::new(8215, 1)).round_to_units(), Some(822));
        assert_eq!(Money::from_decimal(Decimal::new(8225, 1)).round_to_units(), Some(823));
        assert_eq!(Money::from_decimal(Decimal::new(-8215, 1)).round_to_units(), Some(-822));
        assert_eq!(Money::from_decimal(Decimal::new(4, 1)).round_to_units(), Some(0));
    }

    #[test]
    fn test_round_out_of_i64_range() {
        assert_eq!(Money::from_decimal(Decimal::MAX).round_to_units(), None);
        assert_eq!(Money::from_decimal(Decimal::MIN).round_to_units(), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(100);
        let b = Money::from_decimal(Decimal::new(505, 1));
        assert_eq!(a.checked_add(b).unwrap().amount(), Decimal::new(1505, 1));
        assert_eq!(a.checked_mul(Decimal::new(5, 1)), Some(Money::from_units(50)));
        assert_eq!(a.checked_mul_quantity(3), Some(Money::from_units(300)));
    }

    #[test]
    fn test_overflow_is_none() {
        let huge = Money::from_decimal(Decimal::MAX / Decimal::from(2));
        assert_eq!(huge.checked_mul_quantity(3), None);
        assert_eq!(huge.checked_mul(Decimal::from(4)), None);
        assert_eq!(Money::from_decimal(Decimal::MAX).checked_add(Money::from_units(1)), None);
        assert_eq!(huge.checked_mul_quantity(1), Some(huge));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_units(-3);
        assert!(negative.is_negative());
        assert!(!negative.is_positive());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_decimal(Decimal::new(82125, 2))).unwrap();
        assert_eq!(json, "\"821.25\"");
    }
}
