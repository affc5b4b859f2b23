//! Scalar abstraction shared by the `tessera` kernels, materials and dual numbers.
use nalgebra::Scalar;
use num::{One, Zero};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

pub use nalgebra;

/// A scalar that kernels and material callbacks can compute with.
///
/// Implemented by `f64` and by dual numbers, so that generic code evaluated with dual inputs
/// produces exact derivatives alongside the values.
pub trait Numeric:
    Scalar
    + Copy
    + Debug
    + Zero
    + One
    + PartialEq
    + Neg<Output = Self>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + AddAssign<f64>
    + MulAssign<f64>
    + Send
    + Sync
    + 'static
{
    fn from_f64(value: f64) -> Self;

    /// The primal value, with any derivative information discarded.
    ///
    /// Branching on the value yields a derivative that is only valid locally.
    fn value(&self) -> f64;

    fn sqrt(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn powf(self, exponent: f64) -> Self;
    fn abs(self) -> Self;
}

impl Numeric for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn value(&self) -> f64 {
        *self
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    fn exp(self) -> Self {
        f64::exp(self)
    }

    fn ln(self) -> Self {
        f64::ln(self)
    }

    fn sin(self) -> Self {
        f64::sin(self)
    }

    fn cos(self) -> Self {
        f64::cos(self)
    }

    fn tan(self) -> Self {
        f64::tan(self)
    }

    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    fn powf(self, exponent: f64) -> Self {
        f64::powf(self, exponent)
    }

    fn abs(self) -> Self {
        f64::abs(self)
    }
}
