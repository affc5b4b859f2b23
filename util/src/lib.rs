//! Helpers shared by the tests and benchmarks of the workspace.
use nalgebra::{DVector, SVector};

/// Max-norm comparison of two vectors or matrices that prints both operands on failure.
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let (x, y) = (&$x, &$y);
        let max_absdiff = (x - y).amax();
        if !(max_absdiff <= $tol) {
            panic!(
                "matrices differ by {:e} (abstol {:e})\nleft: {}\nright: {}",
                max_absdiff, $tol, x, y
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", stringify!($e));
        }
    }};
}

/// Evaluates `f` at every node and stores the components node-interleaved.
pub fn nodal_vector<const D: usize>(
    coordinates: &[SVector<f64, D>],
    components: usize,
    f: impl Fn(&SVector<f64, D>) -> DVector<f64>,
) -> DVector<f64> {
    let mut result = DVector::zeros(components * coordinates.len());
    for (node, x) in coordinates.iter().enumerate() {
        let value = f(x);
        assert_eq!(value.len(), components, "function returned the wrong number of components");
        result
            .rows_mut(components * node, components)
            .copy_from(&value);
    }
    result
}

/// A reproducible vector of values in `[-1, 1]`, for benchmarks and smoke tests.
pub fn pseudo_random_vector(len: usize, seed: u64) -> DVector<f64> {
    // Knuth's MMIX linear congruential generator
    let mut state = seed;
    DVector::from_fn(len, |_, _| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    })
}
