//! Quadrature rules for the unit segment, square and cube formed by tensor products.
//!
//! Points are enumerated with the `x` coordinate varying fastest.

use crate::univariate::{gauss, to_unit_interval};
use crate::Rule;

/// A Gauss quadrature rule for the unit interval `[0, 1]`.
pub fn segment_gauss(num_points: usize) -> Rule<1> {
    to_unit_interval(gauss(num_points))
}

/// The `D`-fold tensor product of a one-dimensional rule.
fn tensor_product<const D: usize>((weights, points): &Rule<1>) -> Rule<D> {
    let q = weights.len();
    let len = q.pow(D as u32);
    let mut product_weights = Vec::with_capacity(len);
    let mut product_points = Vec::with_capacity(len);
    for index in 0..len {
        let mut point = [0.0; D];
        let mut weight = 1.0;
        let mut rest = index;
        for coordinate in point.iter_mut() {
            let k = rest % q;
            rest /= q;
            *coordinate = points[k][0];
            weight *= weights[k];
        }
        product_weights.push(weight);
        product_points.push(point);
    }
    (product_weights, product_points)
}

/// A Gauss rule for the unit square with the given number of points per dimension.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    tensor_product(&segment_gauss(num_points_per_dim))
}

/// A Gauss rule for the unit cube with the given number of points per dimension.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    tensor_product(&segment_gauss(num_points_per_dim))
}
