//! Small-tensor algebra over [`Numeric`] scalars.
//!
//! `nalgebra` provides products, transposes and dot products for any closed scalar, but its
//! determinant and inverse require `ComplexField`. The routines here cover dimensions one to
//! three with closed-form expressions, so that they differentiate through dual numbers.
use crate::Numeric;
use nalgebra::SMatrix;

/// Determinant of a 1x1, 2x2 or 3x3 matrix.
///
/// # Panics
///
/// Panics if `D > 3`.
pub fn det<T: Numeric, const D: usize>(a: &SMatrix<T, D, D>) -> T {
    match D {
        1 => a[(0, 0)],
        2 => a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)],
        3 => {
            a[(0, 0)] * (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)])
                - a[(0, 1)] * (a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)])
                + a[(0, 2)] * (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)])
        }
        _ => panic!("determinant only implemented for dimensions 1 to 3"),
    }
}

/// Inverse of a 1x1, 2x2 or 3x3 matrix through its adjugate.
///
/// The matrix must be invertible; a singular matrix produces non-finite entries.
///
/// # Panics
///
/// Panics if `D > 3`.
pub fn inv<T: Numeric, const D: usize>(a: &SMatrix<T, D, D>) -> SMatrix<T, D, D> {
    let inv_det = T::one() / det(a);
    match D {
        1 => SMatrix::from_fn(|_, _| inv_det),
        2 => SMatrix::from_fn(|i, j| {
            let cofactor = match (i, j) {
                (0, 0) => a[(1, 1)],
                (0, 1) => -a[(0, 1)],
                (1, 0) => -a[(1, 0)],
                _ => a[(0, 0)],
            };
            cofactor * inv_det
        }),
        3 => SMatrix::from_fn(|i, j| {
            // Entry (i, j) of the adjugate is the (j, i) cofactor
            let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
            let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
            (a[(r0, c0)] * a[(r1, c1)] - a[(r0, c1)] * a[(r1, c0)]) * inv_det
        }),
        _ => panic!("inverse only implemented for dimensions 1 to 3"),
    }
}

pub fn identity<T: Numeric, const D: usize>() -> SMatrix<T, D, D> {
    SMatrix::identity()
}

pub fn trace<T: Numeric, const D: usize>(a: &SMatrix<T, D, D>) -> T {
    (0..D).fold(T::zero(), |acc, i| acc + a[(i, i)])
}

/// The double contraction `A : B`.
pub fn ddot<T: Numeric, const R: usize, const C: usize>(a: &SMatrix<T, R, C>, b: &SMatrix<T, R, C>) -> T {
    a.iter().zip(b.iter()).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

pub fn sym<T: Numeric, const D: usize>(a: &SMatrix<T, D, D>) -> SMatrix<T, D, D> {
    (a + a.transpose()).map(|x| x * 0.5)
}

/// Deviatoric part `A - tr(A) / D I`.
pub fn dev<T: Numeric, const D: usize>(a: &SMatrix<T, D, D>) -> SMatrix<T, D, D> {
    let mean = trace(a) / D as f64;
    SMatrix::from_fn(|i, j| if i == j { a[(i, j)] - mean } else { a[(i, j)] })
}

/// Determinant and inverse of a row-major `dim x dim` matrix stored in a slice.
///
/// The inverse is written into `inverse`, also row-major. Used by the kernels, which work with
/// runtime dimensions.
pub(crate) fn det_and_inverse(dim: usize, a: &[f64], inverse: &mut [f64]) -> f64 {
    debug_assert_eq!(a.len(), dim * dim);
    debug_assert_eq!(inverse.len(), dim * dim);
    match dim {
        1 => {
            inverse[0] = 1.0 / a[0];
            a[0]
        }
        2 => {
            let d = a[0] * a[3] - a[1] * a[2];
            inverse.copy_from_slice(&[a[3] / d, -a[1] / d, -a[2] / d, a[0] / d]);
            d
        }
        3 => {
            let m = nalgebra::Matrix3::from_row_slice(a);
            let d = det(&m);
            let m_inv = inv(&m);
            for i in 0..3 {
                for j in 0..3 {
                    inverse[3 * i + j] = m_inv[(i, j)];
                }
            }
            d
        }
        _ => panic!("Jacobians only supported for dimensions 1 to 3"),
    }
}
