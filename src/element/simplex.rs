use crate::element::{ElementBasis, Family, FiniteElement};
use crate::error::ConfigurationError;
use crate::integrate::{integrate_direct, integrate_sources_direct, pull_back};
use crate::interpolate::{interpolate_direct, to_physical_gradients, QuadratureFields, SumFactorizationCache};
use crate::quadrature::{rule, Geometry, QuadratureRule};
use crate::Numeric;

const TRIANGLE_VERTICES: [[f64; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
const TETRAHEDRON_VERTICES: [[f64; 3]; 4] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
const TRIANGLE_EDGES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];
const TETRAHEDRON_EDGES: [(usize, usize); 6] = [(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];

/// Nodal H1 element of order 1 or 2 on the unit triangle or tetrahedron.
///
/// Simplices have no tensor structure, so the basis is tabulated in full at the quadrature
/// points and contracted directly. Nodes are the vertices followed, for order 2, by the edge
/// midpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexElement {
    geometry: Geometry,
    order: usize,
    rule: QuadratureRule,
    basis: ElementBasis,
}

impl SimplexElement {
    pub fn new(geometry: Geometry, order: usize, rule_index: usize) -> Result<Self, ConfigurationError> {
        let supported = matches!(geometry, Geometry::Triangle | Geometry::Tetrahedron) && (1..=2).contains(&order);
        if !supported {
            return Err(ConfigurationError::UnsupportedElement {
                geometry,
                family: Family::H1,
                order,
            });
        }
        let rule = rule(geometry, rule_index)?;
        let dim = geometry.dimension();
        let num_nodes = num_nodes(geometry, order);
        let mut values = Vec::with_capacity(rule.len() * num_nodes);
        let mut gradients = Vec::with_capacity(rule.len() * num_nodes * dim);
        for xi in rule.points() {
            for (value, gradient) in evaluate_basis(geometry, order, xi) {
                values.push(value);
                gradients.extend_from_slice(&gradient[..dim]);
            }
        }
        let basis = ElementBasis::new(rule.len(), num_nodes, dim, values, gradients);
        Ok(Self {
            geometry,
            order,
            rule,
            basis,
        })
    }
}

fn vertices_and_edges(geometry: Geometry) -> (&'static [[f64; 3]], &'static [(usize, usize)]) {
    match geometry {
        Geometry::Triangle => (&TRIANGLE_VERTICES, &TRIANGLE_EDGES),
        _ => (&TETRAHEDRON_VERTICES, &TETRAHEDRON_EDGES),
    }
}

fn num_nodes(geometry: Geometry, order: usize) -> usize {
    let (vertices, edges) = vertices_and_edges(geometry);
    match order {
        1 => vertices.len(),
        _ => vertices.len() + edges.len(),
    }
}

/// Values and gradients of all basis functions at `xi`, written in terms of the barycentric
/// coordinates `lambda_0 = 1 - sum xi` and `lambda_k = xi_{k-1}`.
fn evaluate_basis(geometry: Geometry, order: usize, xi: &[f64]) -> Vec<(f64, [f64; 3])> {
    let dim = geometry.dimension();
    let (vertices, edges) = vertices_and_edges(geometry);
    let lambda: Vec<f64> = (0..vertices.len())
        .map(|k| if k == 0 { 1.0 - xi.iter().sum::<f64>() } else { xi[k - 1] })
        .collect();
    let grad_lambda = |k: usize| -> [f64; 3] {
        let mut g = [0.0; 3];
        for (j, g_j) in g.iter_mut().enumerate().take(dim) {
            *g_j = match k {
                0 => -1.0,
                k if k - 1 == j => 1.0,
                _ => 0.0,
            };
        }
        g
    };
    let scaled = |g: [f64; 3], s: f64| [g[0] * s, g[1] * s, g[2] * s];
    let add = |a: [f64; 3], b: [f64; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];

    match order {
        1 => (0..vertices.len()).map(|k| (lambda[k], grad_lambda(k))).collect(),
        _ => {
            let vertex_functions = (0..vertices.len())
                .map(|k| (lambda[k] * (2.0 * lambda[k] - 1.0), scaled(grad_lambda(k), 4.0 * lambda[k] - 1.0)));
            let edge_functions = edges.iter().map(|&(a, b)| {
                let gradient = add(scaled(grad_lambda(a), 4.0 * lambda[b]), scaled(grad_lambda(b), 4.0 * lambda[a]));
                (4.0 * lambda[a] * lambda[b], gradient)
            });
            vertex_functions.chain(edge_functions).collect()
        }
    }
}

impl FiniteElement for SimplexElement {
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
        num_nodes(self.geometry, self.order)
    }

    fn quadrature(&self) -> &QuadratureRule {
        &self.rule
    }

    fn reference_nodes(&self) -> Vec<f64> {
        let dim = self.dimension();
        let (vertices, edges) = vertices_and_edges(self.geometry);
        let midpoints = edges
            .iter()
            .map(|&(a, b)| [0.5 * (vertices[a][0] + vertices[b][0]), 0.5 * (vertices[a][1] + vertices[b][1]), 0.5 * (vertices[a][2] + vertices[b][2])]);
        let nodes: Vec<[f64; 3]> = match self.order {
            1 => vertices.to_vec(),
            _ => vertices.iter().copied().chain(midpoints).collect(),
        };
        nodes.iter().flat_map(|x| x[..dim].to_vec()).collect()
    }

    fn basis(&self) -> ElementBasis {
        self.basis.clone()
    }

    fn interpolate<T: Numeric>(
        &self,
        dofs: &[T],
        jacobians: &[f64],
        output: &mut QuadratureFields<T>,
        _cache: &mut SumFactorizationCache<T>,
    ) {
        interpolate_direct(&self.basis, dofs, output);
        to_physical_gradients(output, jacobians);
    }

    fn integrate<T: Numeric>(
        &self,
        fields: &mut QuadratureFields<T>,
        jacobians: &[f64],
        residual: &mut [T],
        _cache: &mut SumFactorizationCache<T>,
    ) {
        pull_back(fields, jacobians, self.rule.weights());
        integrate_direct(&self.basis, fields, residual);
    }

    fn interpolate_values<T: Numeric>(
        &self,
        dofs: &[T],
        output: &mut QuadratureFields<T>,
        _cache: &mut SumFactorizationCache<T>,
    ) {
        let n = self.basis.num_nodes();
        assert_eq!(dofs.len(), output.components() * n, "dof count mismatch");
        for i in 0..output.components() {
            for point in 0..self.basis.num_points() {
                let value = (0..n).fold(T::zero(), |acc, a| acc + dofs[i * n + a] * self.basis.value(point, a));
                output.set_value(point, i, value);
            }
        }
    }

    fn integrate_sources<T: Numeric>(
        &self,
        sources: &QuadratureFields<T>,
        residual: &mut [T],
        _cache: &mut SumFactorizationCache<T>,
    ) {
        integrate_sources_direct(&self.basis, sources, residual)
    }
}
