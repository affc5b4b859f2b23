//! Finite difference approximations, used to verify derivatives computed with dual numbers.
use nalgebra::{DMatrix, DVector};

/// Approximates `f'(x)` with a central difference of step `h`.
pub fn approximate_derivative_fd(mut f: impl FnMut(f64) -> f64, x: f64, h: f64) -> f64 {
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Approximates the gradient of the function `f: R^n -> R` with central differences.
///
/// The vector `x` is mutable in order to contain intermediate computations, but upon returning,
/// its content remains unchanged.
pub fn approximate_gradient_fd(mut f: impl FnMut(&[f64]) -> f64, x: &mut [f64], h: f64) -> DVector<f64> {
    let mut df = DVector::zeros(x.len());
    for i in 0..x.len() {
        let x_i = x[i];
        x[i] = x_i + h;
        let f_plus = f(x);
        x[i] = x_i - h;
        let f_minus = f(x);
        x[i] = x_i;
        df[i] = (f_plus - f_minus) / (2.0 * h);
    }
    df
}

/// Approximates the `m x n` Jacobian `J_ij = df_i / dx_j` of `f: R^n -> R^m` with central
/// differences.
///
/// `f(x, out)` must write `f(x)` into `out`, which has length `m`.
pub fn approximate_jacobian_fd(
    m: usize,
    mut f: impl FnMut(&[f64], &mut [f64]),
    x: &mut [f64],
    h: f64,
) -> DMatrix<f64> {
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);

    // Buffers to hold f(x + e_j h) and f(x - e_j h)
    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);
    for j in 0..n {
        let x_j = x[j];
        x[j] = x_j + h;
        f(x, f_plus.as_mut_slice());
        x[j] = x_j - h;
        f(x, f_minus.as_mut_slice());
        x[j] = x_j;

        let mut column = jacobian.column_mut(j);
        column.copy_from(&f_plus);
        column -= &f_minus;
        column /= 2.0 * h;
    }
    jacobian
}
