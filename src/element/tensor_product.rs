use crate::basis::{nodes, BasisTable};
use crate::element::{ElementBasis, Family, FiniteElement};
use crate::error::ConfigurationError;
use crate::integrate::{
    integrate_hexahedron, integrate_quadrilateral, integrate_segment, integrate_sources_tensor, pull_back,
};
use crate::interpolate::{
    interpolate_hexahedron, interpolate_quadrilateral, interpolate_segment, interpolate_values_tensor,
    to_physical_gradients, QuadratureFields, SumFactorizationCache,
};
use crate::quadrature::tensor::segment_gauss;
use crate::quadrature::{rule, Geometry, QuadratureRule};
use crate::Numeric;

/// Nodal H1 element on the unit segment, square or cube, evaluated by sum factorization.
///
/// Nodes form a lattice of Gauss-Lobatto points with x varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorProductElement {
    geometry: Geometry,
    order: usize,
    rule: QuadratureRule,
    table: BasisTable,
}

impl TensorProductElement {
    pub fn new(geometry: Geometry, order: usize, points_per_dimension: usize) -> Result<Self, ConfigurationError> {
        if !geometry.is_tensor_product() {
            return Err(ConfigurationError::UnsupportedElement {
                geometry,
                family: Family::H1,
                order,
            });
        }
        let rule = rule(geometry, points_per_dimension)?;
        let (_, points) = segment_gauss(points_per_dimension);
        let points: Vec<f64> = points.into_iter().map(|[x]| x).collect();
        let table = BasisTable::new(order, &points)?;
        Ok(Self {
            geometry,
            order,
            rule,
            table,
        })
    }

    /// The one-dimensional basis tables shared by all axes.
    pub fn table(&self) -> &BasisTable {
        &self.table
    }

    pub fn nodes_per_axis(&self) -> usize {
        self.order + 1
    }

    pub fn points_per_axis(&self) -> usize {
        self.table.num_points()
    }
}

/// Splits a lexicographic index (x fastest) into per-axis indices.
fn unravel(index: usize, extent: usize, dim: usize) -> [usize; 3] {
    let mut axes = [0; 3];
    let mut rest = index;
    for axis in axes.iter_mut().take(dim) {
        *axis = rest % extent;
        rest /= extent;
    }
    axes
}

impl FiniteElement for TensorProductElement {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn family(&self) -> Family {
        Family::H1
    }

    fn order(&self) -> usize {
        self.order
    }

    fn num_nodes(&self) -> usize {
        self.nodes_per_axis().pow(self.dimension() as u32)
    }

    fn quadrature(&self) -> &QuadratureRule {
        &self.rule
    }

    fn reference_nodes(&self) -> Vec<f64> {
        let dim = self.dimension();
        // The order was validated on construction
        let nodes_1d = nodes(self.order).unwrap_or_default();
        (0..self.num_nodes())
            .flat_map(|a| {
                let axes = unravel(a, self.nodes_per_axis(), dim);
                (0..dim).map(move |k| axes[k])
            })
            .map(|index| nodes_1d[index])
            .collect()
    }

    fn basis(&self) -> ElementBasis {
        let dim = self.dimension();
        let (n, q) = (self.nodes_per_axis(), self.points_per_axis());
        let num_points = self.rule.len();
        let num_nodes = self.num_nodes();
        let mut values: Vec<f64> = Vec::with_capacity(num_points * num_nodes);
        let mut gradients: Vec<f64> = Vec::with_capacity(num_points * num_nodes * dim);
        for point in 0..num_points {
            let qa = unravel(point, q, dim);
            for node in 0..num_nodes {
                let da = unravel(node, n, dim);
                values.push((0..dim).map(|k| self.table.b(qa[k], da[k])).product());
                for j in 0..dim {
                    let gradient: f64 = (0..dim)
                        .map(|k| {
                            if k == j {
                                self.table.g(qa[k], da[k])
                            } else {
                                self.table.b(qa[k], da[k])
                            }
                        })
                        .product();
                    gradients.push(gradient);
                }
            }
        }
        ElementBasis::new(num_points, num_nodes, dim, values, gradients)
    }

    fn interpolate<T: Numeric>(
        &self,
        dofs: &[T],
        jacobians: &[f64],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    ) {
        match self.geometry {
            Geometry::Segment => interpolate_segment(&self.table, dofs, output),
            Geometry::Quadrilateral => interpolate_quadrilateral(&self.table, dofs, output, cache),
            _ => interpolate_hexahedron(&self.table, dofs, output, cache),
        }
        to_physical_gradients(output, jacobians);
    }

    fn integrate<T: Numeric>(
        &self,
        fields: &mut QuadratureFields<T>,
        jacobians: &[f64],
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    ) {
        pull_back(fields, jacobians, self.rule.weights());
        match self.geometry {
            Geometry::Segment => integrate_segment(&self.table, fields, residual),
            Geometry::Quadrilateral => integrate_quadrilateral(&self.table, fields, residual, cache),
            _ => integrate_hexahedron(&self.table, fields, residual, cache),
        }
    }

    fn interpolate_values<T: Numeric>(
        &self,
        dofs: &[T],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    ) {
        interpolate_values_tensor(&self.table, dofs, output, cache)
    }

    fn integrate_sources<T: Numeric>(
        &self,
        sources: &QuadratureFields<T>,
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    ) {
        integrate_sources_tensor(&self.table, sources, residual, cache)
    }
}
