//! Quadrature rules for finite element reference domains.
//!
//! Reference domains follow one convention throughout:
//!
//! - segments, quadrilaterals and hexahedra are the unit cells `[0, 1]^d`,
//! - triangles and tetrahedra are the unit simplices `{ x_i >= 0, sum x_i <= 1 }`.
//!
//! Tensor-product rules enumerate their points with the `x` coordinate varying fastest, so that
//! the point with per-axis indices `(qx, qy, qz)` is found at `(qz * q + qy) * q + qx`.
//! Kernels that exploit the tensor structure rely on this ordering.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// The largest supported number of Gauss points per dimension for tensor-product cells.
pub const MAX_POINTS_PER_DIMENSION: usize = 8;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// No rule with the requested number of points (per dimension) is available.
    UnsupportedPointCount { geometry: Geometry, points: usize },
    /// No rule is able to integrate polynomials of the requested order exactly.
    UnsupportedOrder { geometry: Geometry, order: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPointCount { geometry, points } => {
                write!(f, "no {:?} quadrature rule with {} points available", geometry, points)
            }
            Self::UnsupportedOrder { geometry, order } => {
                write!(
                    f,
                    "no {:?} quadrature rule exact for polynomials of order {} available",
                    geometry, order
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Reference cell geometries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Geometry {
    Segment,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl Geometry {
    pub fn dimension(&self) -> usize {
        match self {
            Self::Segment => 1,
            Self::Triangle | Self::Quadrilateral => 2,
            Self::Tetrahedron | Self::Hexahedron => 3,
        }
    }

    /// Volume (length, area) of the reference cell.
    pub fn reference_volume(&self) -> f64 {
        match self {
            Self::Segment | Self::Quadrilateral | Self::Hexahedron => 1.0,
            Self::Triangle => 0.5,
            Self::Tetrahedron => 1.0 / 6.0,
        }
    }

    pub fn is_tensor_product(&self) -> bool {
        matches!(self, Self::Segment | Self::Quadrilateral | Self::Hexahedron)
    }
}

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

/// A quadrature rule tagged with the reference geometry it applies to.
///
/// Points are stored contiguously, `dimension` coordinates per point.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    geometry: Geometry,
    points_per_dimension: Option<usize>,
    weights: Vec<f64>,
    points: Vec<f64>,
}

impl QuadratureRule {
    fn from_rule<const D: usize>(geometry: Geometry, points_per_dimension: Option<usize>, rule: Rule<D>) -> Self {
        assert_eq!(geometry.dimension(), D, "Internal error: dimension mismatch");
        let (weights, points) = rule;
        Self {
            geometry,
            points_per_dimension,
            weights,
            points: points.into_iter().flatten().collect(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn dimension(&self) -> usize {
        self.geometry.dimension()
    }

    /// Number of points along each axis, for tensor-product rules.
    pub fn points_per_dimension(&self) -> Option<usize> {
        self.points_per_dimension
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn point(&self, index: usize) -> &[f64] {
        let d = self.dimension();
        &self.points[d * index..d * (index + 1)]
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64]> {
        self.points.chunks_exact(self.dimension())
    }

    /// Approximates the integral of `f` over the reference cell.
    pub fn integrate(&self, f: impl Fn(&[f64]) -> f64) -> f64 {
        self.weights
            .iter()
            .zip(self.points())
            .map(|(w, x)| w * f(x))
            .sum()
    }
}

/// Returns the rule with `points` Gauss points per dimension (tensor-product cells) or the
/// tabulated rule with index `points` (simplices).
///
/// Tensor-product cells accept `1..=MAX_POINTS_PER_DIMENSION`, triangles `1..=5` and
/// tetrahedra `1..=6`.
pub fn rule(geometry: Geometry, points: usize) -> Result<QuadratureRule, Error> {
    let unsupported = Error::UnsupportedPointCount { geometry, points };
    if geometry.is_tensor_product() && !(1..=MAX_POINTS_PER_DIMENSION).contains(&points) {
        return Err(unsupported);
    }

    let q = Some(points);
    match geometry {
        Geometry::Segment => Ok(QuadratureRule::from_rule(geometry, q, tensor::segment_gauss(points))),
        Geometry::Quadrilateral => Ok(QuadratureRule::from_rule(geometry, q, tensor::quadrilateral_gauss(points))),
        Geometry::Hexahedron => Ok(QuadratureRule::from_rule(geometry, q, tensor::hexahedron_gauss(points))),
        Geometry::Triangle => simplex::triangle(points)
            .map(|rule| QuadratureRule::from_rule(geometry, None, rule))
            .ok_or(unsupported),
        Geometry::Tetrahedron => simplex::tetrahedron(points)
            .map(|rule| QuadratureRule::from_rule(geometry, None, rule))
            .ok_or(unsupported),
    }
}

/// The total polynomial degree integrated exactly by `rule(geometry, points)`.
///
/// For tensor-product cells this is the degree per coordinate.
pub fn strength(geometry: Geometry, points: usize) -> Result<usize, Error> {
    let unsupported = Error::UnsupportedPointCount { geometry, points };
    match geometry {
        Geometry::Segment | Geometry::Quadrilateral | Geometry::Hexahedron => {
            if (1..=MAX_POINTS_PER_DIMENSION).contains(&points) {
                Ok(2 * points - 1)
            } else {
                Err(unsupported)
            }
        }
        Geometry::Triangle => simplex::TRIANGLE_STRENGTHS
            .get(points.wrapping_sub(1))
            .copied()
            .ok_or(unsupported),
        Geometry::Tetrahedron => simplex::TETRAHEDRON_STRENGTHS
            .get(points.wrapping_sub(1))
            .copied()
            .ok_or(unsupported),
    }
}

/// Maps a polynomial order to the number of points (per dimension) of the cheapest rule that
/// integrates polynomials of that order exactly.
pub fn points_for_order(geometry: Geometry, order: usize) -> Result<usize, Error> {
    let unsupported = Error::UnsupportedOrder { geometry, order };
    let strengths: &[usize] = match geometry {
        Geometry::Segment | Geometry::Quadrilateral | Geometry::Hexahedron => {
            let q = order / 2 + 1;
            return if q <= MAX_POINTS_PER_DIMENSION {
                Ok(q)
            } else {
                Err(unsupported)
            };
        }
        Geometry::Triangle => &simplex::TRIANGLE_STRENGTHS,
        Geometry::Tetrahedron => &simplex::TETRAHEDRON_STRENGTHS,
    };
    strengths
        .iter()
        .position(|&strength| strength >= order)
        .map(|index| index + 1)
        .ok_or(unsupported)
}

/// Returns the cheapest rule that integrates polynomials of the given order exactly.
pub fn rule_for_order(geometry: Geometry, order: usize) -> Result<QuadratureRule, Error> {
    rule(geometry, points_for_order(geometry, order)?)
}
