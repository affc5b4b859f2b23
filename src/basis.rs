//! One-dimensional nodal basis tables.
//!
//! The nodal basis of order `p` consists of the `p + 1` Lagrange polynomials interpolating at
//! the Gauss-Lobatto points of the unit interval. Tensor-product elements evaluate these at the
//! one-dimensional quadrature points once and reuse the resulting tables for every element and
//! for both directions of the interpolate/integrate pair.
use crate::error::ConfigurationError;
use crate::quadrature::univariate::gauss_lobatto_points;

/// Values of the Lagrange polynomials on `nodes` at `x`.
pub fn lagrange_values(nodes: &[f64], x: f64, values: &mut [f64]) {
    assert_eq!(nodes.len(), values.len());
    for (j, value) in values.iter_mut().enumerate() {
        *value = nodes
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != j)
            .map(|(_, &x_k)| (x - x_k) / (nodes[j] - x_k))
            .product();
    }
}

/// Derivatives of the Lagrange polynomials on `nodes` at `x`.
pub fn lagrange_derivatives(nodes: &[f64], x: f64, derivatives: &mut [f64]) {
    assert_eq!(nodes.len(), derivatives.len());
    let n = nodes.len();
    for (j, derivative) in derivatives.iter_mut().enumerate() {
        let x_j = nodes[j];
        let mut sum = 0.0;
        for m in (0..n).filter(|&m| m != j) {
            let mut term = 1.0 / (x_j - nodes[m]);
            for k in (0..n).filter(|&k| k != j && k != m) {
                term *= (x - nodes[k]) / (x_j - nodes[k]);
            }
            sum += term;
        }
        *derivative = sum;
    }
}

/// Gauss-Lobatto nodes of the order `p` nodal basis on `[0, 1]`.
pub fn nodes(order: usize) -> Result<Vec<f64>, ConfigurationError> {
    gauss_lobatto_points(order + 1).ok_or(ConfigurationError::UnsupportedOrder { order })
}

/// Values `B[q][n]` and derivatives `G[q][n]` of the order `p` nodal basis at a set of points.
///
/// Both tables are stored row-major with one row per point.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisTable {
    order: usize,
    num_points: usize,
    b: Vec<f64>,
    g: Vec<f64>,
}

impl BasisTable {
    /// Tabulates the order `p >= 1` basis at the given points of the unit interval.
    pub fn new(order: usize, points: &[f64]) -> Result<Self, ConfigurationError> {
        let nodes = nodes(order)?;
        let n = nodes.len();
        let mut b = vec![0.0; points.len() * n];
        let mut g = vec![0.0; points.len() * n];
        for (q, &x) in points.iter().enumerate() {
            lagrange_values(&nodes, x, &mut b[q * n..(q + 1) * n]);
            lagrange_derivatives(&nodes, x, &mut g[q * n..(q + 1) * n]);
        }
        Ok(Self {
            order,
            num_points: points.len(),
            b,
            g,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn num_nodes(&self) -> usize {
        self.order + 1
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[inline(always)]
    pub fn b(&self, q: usize, n: usize) -> f64 {
        self.b[q * (self.order + 1) + n]
    }

    #[inline(always)]
    pub fn g(&self, q: usize, n: usize) -> f64 {
        self.g[q * (self.order + 1) + n]
    }

    pub fn values(&self) -> &[f64] {
        &self.b
    }

    pub fn derivatives(&self) -> &[f64] {
        &self.g
    }
}
