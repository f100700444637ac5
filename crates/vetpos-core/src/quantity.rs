//! # Quantity Module
//!
//! Stock quantities are decimal (2.5 ml, 0.25 kg), so they use the same trick
//! as [`Money`](crate::Money): a fixed-point integer. One unit is 1000 milli.
//!
//! ```text
//!   Quantity::from_units(2)      → 2000 milli   → "2"
//!   Quantity::from_milli(2500)   → 2500 milli   → "2.5"
//!   Quantity::from_milli(-5000)  → ledger row for 5 units leaving stock
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Milli-units per whole unit.
pub const MILLI_PER_UNIT: i64 = 1_000;

/// A signed stock quantity in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Returns the raw value in thousandths, as stored in `*_milli` columns.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
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
}

/// Prints the shortest exact decimal: `5`, `2.5`, `0.125`, `-5`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let units = (self.0 / MILLI_PER_UNIT).abs();
        let frac = (self.0 % MILLI_PER_UNIT).abs();
        if frac == 0 {
            return write!(f, "{}{}", sign, units);
        }
        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, units, digits.trim_end_matches('0'))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(5).to_string(), "5");
        assert_eq!(Quantity::from_milli(2500).to_string(), "2.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
        assert_eq!(Quantity::from_milli(-5000).to_string(), "-5");
        assert_eq!(Quantity::from_milli(-1050).to_string(), "-1.05");
    }

    #[test]
    fn test_arithmetic() {
        let mut stock = Quantity::from_units(10);
        stock -= Quantity::from_units(5);
        assert_eq!(stock, Quantity::from_units(5));
        assert_eq!(-stock, Quantity::from_milli(-5000));
        assert_eq!(stock + Quantity::from_milli(500), Quantity::from_milli(5500));
    }
}
