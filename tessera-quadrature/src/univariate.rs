//! Quadrature rules for one-dimensional domains.
//!
//! Rules are first constructed on `[-1, 1]`, where the Legendre machinery is most natural, and
//! then mapped to the unit interval with [`to_unit_interval`].

use crate::Rule;
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE: f64 = 1e-15;

/// Evaluates the Legendre polynomials `(P_n(x), P_{n-1}(x))` with Bonnet's recursion
/// `k P_k = (2k - 1) x P_{k-1} - (k - 1) P_{k-2}`.
///
/// For `n == 0` the second entry is zero.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut current, mut previous) = (1.0, 0.0);
    for k in 1..=n {
        let k = k as f64;
        let next = ((2.0 * k - 1.0) * x * current - (k - 1.0) * previous) / k;
        previous = current;
        current = next;
    }
    (current, previous)
}

/// `P'_n(x)`, valid in the open interval `(-1, 1)` only.
fn legendre_derivative(n: usize, x: f64) -> f64 {
    let (p_n, p_prev) = legendre(n, x);
    n as f64 * (x * p_n - p_prev) / (x * x - 1.0)
}

/// Refines `x` with Newton's method on `f`, which returns the function value and its derivative.
fn newton(mut x: f64, f: impl Fn(f64) -> (f64, f64)) -> f64 {
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let (value, derivative) = f(x);
        let step = value / derivative;
        x -= step;
        if step.abs() <= NEWTON_TOLERANCE {
            break;
        }
    }
    x
}

/// Gauss quadrature for the reference interval `[-1, 1]`.
///
/// The rule with `n` points integrates polynomials of degree up to `2 n - 1` exactly. Points
/// are returned in increasing order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];
    // Roots come in pairs +-x; only the negative half (and the middle root for odd n) is solved for
    for i in 0..(n + 1) / 2 {
        let guess = -(PI * (4 * i + 3) as f64 / (4 * n + 2) as f64).cos();
        let x = newton(guess, |x| (legendre(n, x).0, legendre_derivative(n, x)));
        let dp = legendre_derivative(n, x);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        points[i] = [x];
        weights[i] = w;
        points[n - 1 - i] = [-x];
        weights[n - 1 - i] = w;
    }
    if n % 2 == 1 {
        points[n / 2] = [0.0];
    }
    (weights, points)
}

/// Gauss-Lobatto quadrature for the reference interval `[-1, 1]`.
///
/// The rule with `n` points contains both endpoints and integrates polynomials of degree up to
/// `2 n - 3` exactly. Its interior points are the roots of `P'_{n-1}`.
///
/// Returns `None` if fewer than two points are requested.
pub fn try_gauss_lobatto(num_points: usize) -> Option<Rule<1>> {
    let n = num_points;
    if n < 2 {
        return None;
    }
    let degree = n - 1;

    // The interior points are the roots of x P_N - P_{N-1}, with derivative n P_N. The
    // Chebyshev-Gauss-Lobatto points serve as initial guesses.
    let mut points = vec![-1.0; n];
    points[n - 1] = 1.0;
    for i in 1..(n + 1) / 2 {
        let guess = -(PI * i as f64 / degree as f64).cos();
        let x = newton(guess, |x| {
            let (p, p_prev) = legendre(degree, x);
            (x * p - p_prev, n as f64 * p)
        });
        points[i] = x;
        points[n - 1 - i] = -x;
    }
    if n % 2 == 1 {
        points[n / 2] = 0.0;
    }

    let scale = 2.0 / (degree * n) as f64;
    let weights = points
        .iter()
        .map(|&x| {
            let (p, _) = legendre(degree, x);
            scale / (p * p)
        })
        .collect();
    Some((weights, points.into_iter().map(|x| [x]).collect()))
}

/// Maps a rule on `[-1, 1]` to the unit interval `[0, 1]`.
pub fn to_unit_interval((weights, points): Rule<1>) -> Rule<1> {
    (
        weights.iter().map(|w| w / 2.0).collect(),
        points.iter().map(|&[x]| [(x + 1.0) / 2.0]).collect(),
    )
}

/// Gauss-Lobatto points on the unit interval `[0, 1]`, in increasing order.
///
/// Returns `None` if fewer than two points are requested.
pub fn gauss_lobatto_points(num_points: usize) -> Option<Vec<f64>> {
    let (_, points) = to_unit_interval(try_gauss_lobatto(num_points)?);
    Some(points.into_iter().map(|[x]| x).collect())
}
