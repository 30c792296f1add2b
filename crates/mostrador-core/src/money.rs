//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    Bs. 10.00 / 3 = Bs. 3.33 (×3 = Bs. 9.99)  → Lost a centavo!         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every stored amount is whole cents (i64). Fractional unit prices    │
//! │    (a dozen price divided by 12) live in `pricing::UnitPrice` as an    │
//! │    exact rational and become Money only at the persistence boundary.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mostrador_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1700); // Bs. 17.00
//!
//! // Arithmetic operations
//! let total = price + Money::from_cents(500); // Bs. 22.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (differences)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    ///
    /// let price = Money::from_cents(1700); // Bs. 17.00
    /// assert_eq!(price.cents(), 1700);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    ///
    /// let price = Money::from_major_minor(17, 50); // Bs. 17.50
    /// assert_eq!(price.cents(), 1750);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1700);
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 5100);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Divides `numer` by `denom`, rounding half away from zero.
///
/// This is the single rounding rule applied when a full-precision amount
/// (a tier price split across pack units, times a quantity) is persisted
/// as whole cents.
///
/// ## Example
/// ```rust
/// use mostrador_core::money::round_div_half_away;
///
/// assert_eq!(round_div_half_away(20400, 12), 1700); // exact
/// assert_eq!(round_div_half_away(101, 6), 17);      // 16.83.. → 17
/// assert_eq!(round_div_half_away(42, 1), 42);       // identity
/// ```
pub fn round_div_half_away(numer: i64, denom: i64) -> i64 {
    debug_assert!(denom > 0, "denominator must be positive");
    let n = numer as i128;
    let d = denom as i128;
    let rounded = if n >= 0 {
        (2 * n + d) / (2 * d)
    } else {
        (2 * n - d) / (2 * d)
    };
    rounded as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and diagnostics. The boundary layer owns actual
/// user-facing formatting and localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Bs. {}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1799);
        assert_eq!(money.cents(), 1799);
        assert_eq!(money.major(), 17);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        let money = Money::from_major_minor(17, 50);
        assert_eq!(money.cents(), 1750);

        let negative = Money::from_major_minor(-5, 50);
        assert_eq!(negative.cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1700)), "Bs. 17.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-Bs. 5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "Bs. 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_round_half_away_exact() {
        // 204.00 split across a dozen is exactly 17.00
        assert_eq!(round_div_half_away(20400, 12), 1700);
    }

    #[test]
    fn test_round_half_away_midpoint() {
        // .5 rounds away from zero, both signs
        assert_eq!(round_div_half_away(5, 2), 3);
        assert_eq!(round_div_half_away(-5, 2), -3);
        assert_eq!(round_div_half_away(3, 2), 2);
        assert_eq!(round_div_half_away(1, 2), 1);
    }

    #[test]
    fn test_round_half_away_below_midpoint() {
        assert_eq!(round_div_half_away(100, 6), 17); // 16.66.. → 17
        assert_eq!(round_div_half_away(98, 6), 16); // 16.33.. → 16
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());
    }
}
