//! # Money Module
//!
//! Integer-cent money for sale totals, line prices and cash movements.
//!
//! ## Tax-Inclusive Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Clinic prices already include tax.                                     │
//! │                                                                         │
//! │    line total   = quantity × unit price − line discount                 │
//! │    subtotal     = Σ line totals                                         │
//! │    total        = subtotal − sale discount                              │
//! │    tax          = portion of total that is tax   (disclosed only)       │
//! │                                                                         │
//! │  total is NEVER subtotal + tax.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::{Quantity, MILLI_PER_UNIT};
use crate::types::TaxRate;

/// A monetary value in the smallest currency unit (cents).
///
/// Signed, so refunds and discounts can be expressed without a second type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use vetpos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a fixed-point quantity.
    ///
    /// Half a cent rounds away from zero, so 0.5 kg at 3.33 is 1.67.
    ///
    /// ```rust
    /// use vetpos_core::{Money, Quantity};
    ///
    /// let price = Money::from_cents(333);
    /// assert_eq!(price.times_quantity(Quantity::from_milli(500)).cents(), 167);
    /// assert_eq!(price.times_quantity(Quantity::from_units(3)).cents(), 999);
    /// ```
    pub fn times_quantity(&self, quantity: Quantity) -> Money {
        let product = self.0 as i128 * quantity.milli() as i128;
        let half = MILLI_PER_UNIT as i128 / 2;
        let rounded = if product >= 0 {
            (product + half) / MILLI_PER_UNIT as i128
        } else {
            (product - half) / MILLI_PER_UNIT as i128
        };
        Money(rounded as i64)
    }

    /// Returns the tax already contained in a tax-inclusive amount.
    ///
    /// `tax = amount × bps / (10000 + bps)`, rounded half up.
    ///
    /// ```rust
    /// use vetpos_core::{Money, TaxRate};
    ///
    /// // 115.00 at 15% inclusive carries 15.00 of tax
    /// let tax = Money::from_cents(11_500).inclusive_tax(TaxRate::from_bps(1500));
    /// assert_eq!(tax.cents(), 1_500);
    /// ```
    pub fn inclusive_tax(&self, rate: TaxRate) -> Money {
        if rate.is_zero() {
            return Money::zero();
        }
        let divisor = 10_000 + rate.bps() as i128;
        let tax = (self.0 as i128 * rate.bps() as i128 * 2 + divisor) / (divisor * 2);
        Money(tax as i64)
    }

    /// The smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

/// Debug-oriented display (`12.34`, `-5.50`); currency symbols belong to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
