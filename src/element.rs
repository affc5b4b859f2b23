//! Reference finite elements.
//!
//! An element is identified by its reference geometry, its family and a polynomial order. The
//! combination is resolved at runtime by [`Element::new`], while the kernels themselves remain
//! free functions parameterized by the tabulated basis.
use crate::error::ConfigurationError;
use crate::interpolate::{QuadratureFields, SumFactorizationCache};
use crate::quadrature::{Geometry, QuadratureRule};
use crate::Numeric;
use serde::{Deserialize, Serialize};

mod simplex;
mod tensor_product;

pub use simplex::SimplexElement;
pub use tensor_product::TensorProductElement;

/// Continuity class of the element's function space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// Continuous nodal Lagrange elements.
    H1,
}

/// Basis values and reference gradients of every element basis function at every quadrature
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBasis {
    num_points: usize,
    num_nodes: usize,
    dim: usize,
    values: Vec<f64>,
    gradients: Vec<f64>,
}

impl ElementBasis {
    /// Collects basis values `[point][node]` and gradients `[point][node][axis]`.
    pub fn new(num_points: usize, num_nodes: usize, dim: usize, values: Vec<f64>, gradients: Vec<f64>) -> Self {
        assert_eq!(values.len(), num_points * num_nodes);
        assert_eq!(gradients.len(), num_points * num_nodes * dim);
        Self {
            num_points,
            num_nodes,
            dim,
            values,
            gradients,
        }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline(always)]
    pub fn value(&self, point: usize, node: usize) -> f64 {
        self.values[point * self.num_nodes + node]
    }

    #[inline(always)]
    pub fn gradient(&self, point: usize, node: usize, axis: usize) -> f64 {
        self.gradients[(point * self.num_nodes + node) * self.dim + axis]
    }
}

/// Common interface of reference elements.
///
/// Dofs are component-major: all nodal values of the first component, then the second and so
/// on. `jacobians` holds one row-major `dim x dim` geometric Jacobian per quadrature point.
pub trait FiniteElement {
    fn geometry(&self) -> Geometry;

    fn family(&self) -> Family;

    fn order(&self) -> usize;

    fn dimension(&self) -> usize {
        self.geometry().dimension()
    }

    /// Number of nodes per field component.
    fn num_nodes(&self) -> usize;

    fn quadrature(&self) -> &QuadratureRule;

    /// Reference coordinates of the element nodes, `dimension()` values per node.
    fn reference_nodes(&self) -> Vec<f64>;

    /// The full basis tabulated at the quadrature points.
    fn basis(&self) -> ElementBasis;

    /// Field values and physical gradients at the quadrature points.
    fn interpolate<T: Numeric>(
        &self,
        dofs: &[T],
        jacobians: &[f64],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    );

    /// Accumulates `sum_q (s_q phi + f_q . grad phi) det(J_q) w_q` into `residual` for every
    /// basis function `phi`, with `s` the values and `f` the gradients of `fields` given in
    /// physical space. `fields` is overwritten with intermediate results.
    fn integrate<T: Numeric>(
        &self,
        fields: &mut QuadratureFields<T>,
        jacobians: &[f64],
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    );

    /// Field values at the quadrature points.
    fn interpolate_values<T: Numeric>(
        &self,
        dofs: &[T],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    );

    /// Accumulates `sum_q s_q phi` into `residual`, with the sources already scaled by the
    /// integration measure.
    fn integrate_sources<T: Numeric>(
        &self,
        sources: &QuadratureFields<T>,
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    );
}

/// A reference element resolved from (geometry, family, order).
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    TensorProduct(TensorProductElement),
    Simplex(SimplexElement),
}

impl Element {
    /// Creates the element of the given order with the quadrature rule `points`, interpreted as
    /// points per dimension for tensor-product cells and as table index for simplices.
    pub fn new(geometry: Geometry, family: Family, order: usize, points: usize) -> Result<Self, ConfigurationError> {
        match (geometry, family) {
            (Geometry::Segment | Geometry::Quadrilateral | Geometry::Hexahedron, Family::H1) => {
                TensorProductElement::new(geometry, order, points).map(Self::TensorProduct)
            }
            (Geometry::Triangle | Geometry::Tetrahedron, Family::H1) => {
                SimplexElement::new(geometry, order, points).map(Self::Simplex)
            }
        }
    }

    pub fn as_tensor_product(&self) -> Option<&TensorProductElement> {
        match self {
            Self::TensorProduct(element) => Some(element),
            Self::Simplex(_) => None,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $element:ident => $body:expr) => {
        match $self {
            Element::TensorProduct($element) => $body,
            Element::Simplex($element) => $body,
        }
    };
}

impl FiniteElement for Element {
    fn geometry(&self) -> Geometry {
        dispatch!(self, e => e.geometry())
    }

    fn family(&self) -> Family {
        dispatch!(self, e => e.family())
    }

    fn order(&self) -> usize {
        dispatch!(self, e => e.order())
    }

    fn num_nodes(&self) -> usize {
        dispatch!(self, e => e.num_nodes())
    }

    fn quadrature(&self) -> &QuadratureRule {
        dispatch!(self, e => e.quadrature())
    }

    fn reference_nodes(&self) -> Vec<f64> {
        dispatch!(self, e => e.reference_nodes())
    }

    fn basis(&self) -> ElementBasis {
        dispatch!(self, e => e.basis())
    }

    fn interpolate<T: Numeric>(
        &self,
        dofs: &[T],
        jacobians: &[f64],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    ) {
        dispatch!(self, e => e.interpolate(dofs, jacobians, output, cache))
    }

    fn integrate<T: Numeric>(
        &self,
        fields: &mut QuadratureFields<T>,
        jacobians: &[f64],
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    ) {
        dispatch!(self, e => e.integrate(fields, jacobians, residual, cache))
    }

    fn interpolate_values<T: Numeric>(
        &self,
        dofs: &[T],
        output: &mut QuadratureFields<T>,
        cache: &mut SumFactorizationCache<T>,
    ) {
        dispatch!(self, e => e.interpolate_values(dofs, output, cache))
    }

    fn integrate_sources<T: Numeric>(
        &self,
        sources: &QuadratureFields<T>,
        residual: &mut [T],
        cache: &mut SumFactorizationCache<T>,
    ) {
        dispatch!(self, e => e.integrate_sources(sources, residual, cache))
    }
}
