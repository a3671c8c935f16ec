//! Fixed-point quantity value object.
//!
//! Stock levels, movement deltas, and transaction-item quantities all share
//! this type (thousandths of a unit, signed) so summing movements can never
//! drift against the stock column.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Signed quantity in thousandths of a unit (3 decimal places).
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    pub const ONE: Quantity = Quantity(1000);

    pub const fn from_units(units: i64) -> Self {
        Self(units * 1000)
    }

    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    pub const fn thousandths(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Quantity {
        Quantity(self.0.abs())
    }

    /// Fixed-point multiplication (used for purchase-unit conversion).
    ///
    /// Rounds half away from zero at the thousandth.
    pub fn mul_fixed(self, factor: Quantity) -> Quantity {
        let raw = self.0 as i128 * factor.0 as i128;
        let q = raw / 1000;
        let r = raw % 1000;
        let rounded = if r.abs() * 2 >= 1000 {
            q + raw.signum()
        } else {
            q
        };
        Quantity(rounded as i64)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity(-self.0)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Quantity {
        iter.copied().sum()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if abs % 1000 == 0 {
            write!(f, "{sign}{}", abs / 1000)
        } else {
            write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
        }
    }
}

impl ValueObject for Quantity {}
