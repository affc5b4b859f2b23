//! Forward-mode automatic differentiation with dual numbers.
//!
//! A [`Dual`] carries a value together with its derivative with respect to one or more seeded
//! inputs. Arithmetic and elementary functions apply the chain rule, so that any expression
//! written generically over [`Numeric`] yields exact derivatives when evaluated with dual
//! inputs.
//!
//! Code that branches on [`Numeric::value`] differentiates the branch that was taken. The
//! resulting derivative is valid locally but may be discontinuous across the branch point.
use crate::Numeric;
use nalgebra::{SMatrix, SVector};
use num::{One, Zero};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// The derivative part of a dual number.
///
/// `f64` gives a directional derivative, `SVector<f64, N>` a gradient with respect to `N`
/// seeded inputs.
pub trait Gradient:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Zero
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<f64, Output = Self>
{
}

impl Gradient for f64 {}

impl<const N: usize> Gradient for SVector<f64, N> {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Dual<G = f64> {
    pub value: f64,
    pub gradient: G,
}

impl<G: Gradient> Dual<G> {
    pub fn new(value: f64, gradient: G) -> Self {
        Self { value, gradient }
    }

    /// A dual number whose derivative vanishes.
    pub fn constant(value: f64) -> Self {
        Self::new(value, G::zero())
    }

    /// Applies a scalar function with the given value and derivative at `self.value`.
    fn chain(self, value: f64, derivative: f64) -> Self {
        Self::new(value, self.gradient * derivative)
    }
}

impl Dual<f64> {
    /// A dual number seeded as the variable to differentiate with respect to.
    pub fn variable(value: f64) -> Self {
        Self::new(value, 1.0)
    }
}

impl<G: Gradient> From<f64> for Dual<G> {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<G: Gradient> Neg for Dual<G> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.value, -self.gradient)
    }
}

impl<G: Gradient> Add for Dual<G> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.value + rhs.value, self.gradient + rhs.gradient)
    }
}

impl<G: Gradient> Sub for Dual<G> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.value - rhs.value, self.gradient - rhs.gradient)
    }
}

impl<G: Gradient> Mul for Dual<G> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.value * rhs.value,
            self.gradient * rhs.value + rhs.gradient * self.value,
        )
    }
}

impl<G: Gradient> Div for Dual<G> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        let value = self.value * inv;
        Self::new(value, (self.gradient - rhs.gradient * value) * inv)
    }
}

impl<G: Gradient> Add<f64> for Dual<G> {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        Self::new(self.value + rhs, self.gradient)
    }
}

impl<G: Gradient> Sub<f64> for Dual<G> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        Self::new(self.value - rhs, self.gradient)
    }
}

impl<G: Gradient> Mul<f64> for Dual<G> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.value * rhs, self.gradient * rhs)
    }
}

impl<G: Gradient> Div<f64> for Dual<G> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self * (1.0 / rhs)
    }
}

impl<G: Gradient> Add<Dual<G>> for f64 {
    type Output = Dual<G>;

    fn add(self, rhs: Dual<G>) -> Dual<G> {
        rhs + self
    }
}

impl<G: Gradient> Sub<Dual<G>> for f64 {
    type Output = Dual<G>;

    fn sub(self, rhs: Dual<G>) -> Dual<G> {
        -rhs + self
    }
}

impl<G: Gradient> Mul<Dual<G>> for f64 {
    type Output = Dual<G>;

    fn mul(self, rhs: Dual<G>) -> Dual<G> {
        rhs * self
    }
}

impl<G: Gradient> Div<Dual<G>> for f64 {
    type Output = Dual<G>;

    fn div(self, rhs: Dual<G>) -> Dual<G> {
        let inv = 1.0 / rhs.value;
        rhs.chain(self * inv, -self * inv * inv)
    }
}

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<G: Gradient> $trait for Dual<G> {
            fn $method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }

        impl<G: Gradient> $trait<f64> for Dual<G> {
            fn $method(&mut self, rhs: f64) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, +);
impl_assign_op!(SubAssign, sub_assign, -);
impl_assign_op!(MulAssign, mul_assign, *);
impl_assign_op!(DivAssign, div_assign, /);

impl<G: Gradient> Zero for Dual<G> {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.value == 0.0 && self.gradient == G::zero()
    }
}

impl<G: Gradient> One for Dual<G> {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl<G: Gradient> Numeric for Dual<G> {
    fn from_f64(value: f64) -> Self {
        Self::constant(value)
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn sqrt(self) -> Self {
        let s = self.value.sqrt();
        self.chain(s, 0.5 / s)
    }

    fn exp(self) -> Self {
        let e = self.value.exp();
        self.chain(e, e)
    }

    fn ln(self) -> Self {
        self.chain(self.value.ln(), 1.0 / self.value)
    }

    fn sin(self) -> Self {
        self.chain(self.value.sin(), self.value.cos())
    }

    fn cos(self) -> Self {
        self.chain(self.value.cos(), -self.value.sin())
    }

    fn tan(self) -> Self {
        let t = self.value.tan();
        self.chain(t, 1.0 + t * t)
    }

    fn powi(self, n: i32) -> Self {
        let derivative = match n {
            0 => 0.0,
            n => n as f64 * self.value.powi(n - 1),
        };
        self.chain(self.value.powi(n), derivative)
    }

    fn powf(self, exponent: f64) -> Self {
        self.chain(
            self.value.powf(exponent),
            exponent * self.value.powf(exponent - 1.0),
        )
    }

    fn abs(self) -> Self {
        let sign = if self.value >= 0.0 { 1.0 } else { -1.0 };
        self.chain(self.value.abs(), sign)
    }
}

/// Seeds every entry of `v` as an independent variable.
pub fn make_dual<const N: usize>(v: &SVector<f64, N>) -> SVector<Dual<SVector<f64, N>>, N> {
    SVector::from_fn(|i, _| Dual::new(v[i], SVector::from_fn(|k, _| if k == i { 1.0 } else { 0.0 })))
}

/// Seeds every entry of `m` as an independent variable, numbering entries column by column.
///
/// # Panics
///
/// Panics if `N != R * C`.
pub fn make_dual_matrix<const R: usize, const C: usize, const N: usize>(
    m: &SMatrix<f64, R, C>,
) -> SMatrix<Dual<SVector<f64, N>>, R, C> {
    assert_eq!(N, R * C, "gradient dimension must equal the number of matrix entries");
    SMatrix::from_fn(|i, j| {
        let seed = i + R * j;
        Dual::new(m[(i, j)], SVector::from_fn(|k, _| if k == seed { 1.0 } else { 0.0 }))
    })
}

pub fn get_value<G: Gradient, const R: usize, const C: usize>(m: &SMatrix<Dual<G>, R, C>) -> SMatrix<f64, R, C> {
    m.map(|x| x.value)
}

/// Directional derivatives of the entries of `m`.
pub fn get_gradient<const R: usize, const C: usize>(m: &SMatrix<Dual<f64>, R, C>) -> SMatrix<f64, R, C> {
    m.map(|x| x.gradient)
}

/// The Jacobian `J[i][k] = d v_i / d x_k` of a vector seeded with [`make_dual`].
pub fn get_jacobian<const M: usize, const N: usize>(v: &SVector<Dual<SVector<f64, N>>, M>) -> SMatrix<f64, M, N> {
    SMatrix::from_fn(|i, k| v[i].gradient[k])
}
