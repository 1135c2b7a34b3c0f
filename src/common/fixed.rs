//! Signed Q17.14 fixed-point numbers.
//!
//! A [`Fixed`] stores the real value `raw / 2^14` in an `i32`. Products and
//! quotients of two fixed-point values go through an `i64` so the scale factor
//! does not overflow the intermediate.

use core::ops::{Div, Mul};

use bytemuck::NoUninit;
use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of integer bits.
pub const P: u32 = 17;
/// Number of fractional bits.
pub const Q: u32 = 14;
const F: i32 = 1 << Q;

const _: () = assert!(P + Q == 31);

#[repr(transparent)]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    NoUninit,
)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(F);

    /// Converts integer `x` to fixed point.
    pub const fn from_int(x: i32) -> Self { Self(x * F) }

    pub const fn from_raw(raw: i32) -> Self { Self(raw) }

    pub const fn raw(self) -> i32 { self.0 }

    pub const fn add_int(self, y: i32) -> Self { Self(self.0 + y * F) }

    pub const fn sub_int(self, y: i32) -> Self { Self(self.0 - y * F) }

    pub const fn mul(self, y: Self) -> Self { Self((self.0 as i64 * y.0 as i64 / F as i64) as i32) }

    pub const fn mul_int(self, y: i32) -> Self { Self(self.0 * y) }

    /// Divides by another fixed-point value.
    ///
    /// # Panics
    /// If `y` is zero.
    pub const fn div(self, y: Self) -> Self { Self((self.0 as i64 * F as i64 / y.0 as i64) as i32) }

    pub const fn div_int(self, y: i32) -> Self { Self(self.0 / y) }

    /// Truncates toward zero.
    pub const fn to_int_trunc(self) -> i32 { self.0 / F }

    /// Rounds to nearest, with halves rounded away from zero.
    pub const fn to_int_round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + F / 2) / F
        } else {
            (self.0 - F / 2) / F
        }
    }

    /// Converts with `to_int_round` when `round` is set, otherwise with
    /// `to_int_trunc`.
    pub const fn to_int(self, round: bool) -> i32 {
        if round {
            self.to_int_round()
        } else {
            self.to_int_trunc()
        }
    }
}

impl From<i32> for Fixed {
    fn from(x: i32) -> Self { Self::from_int(x) }
}

impl Add<i32> for Fixed {
    type Output = Self;

    fn add(self, rhs: i32) -> Self::Output { self.add_int(rhs) }
}

impl Sub<i32> for Fixed {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self::Output { self.sub_int(rhs) }
}

impl Mul for Fixed {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output { Fixed::mul(self, rhs) }
}

impl Mul<i32> for Fixed {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output { self.mul_int(rhs) }
}

impl Div for Fixed {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output { Fixed::div(self, rhs) }
}

impl Div<i32> for Fixed {
    type Output = Self;

    fn div(self, rhs: i32) -> Self::Output { self.div_int(rhs) }
}
