//! The interface between the assembly loop and material models.
use crate::Numeric;
use nalgebra::{Const, DVector, Dyn, OMatrix, SMatrix, SVector, Scalar};

/// Gradient of a field with one row per component and one column per spatial axis.
pub type FieldGradient<T, const D: usize> = OMatrix<T, Dyn, Const<D>>;

/// Value and physical gradient of one field at a quadrature point.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue<T: Scalar, const D: usize> {
    pub value: DVector<T>,
    pub gradient: FieldGradient<T, D>,
}

impl<T: Numeric, const D: usize> FieldValue<T, D> {
    pub fn new(value: DVector<T>, gradient: FieldGradient<T, D>) -> Self {
        assert_eq!(value.len(), gradient.nrows(), "value and gradient must have the same number of components");
        Self { value, gradient }
    }

    pub fn components(&self) -> usize {
        self.value.len()
    }

    /// The value of a scalar field.
    pub fn scalar(&self) -> T {
        self.value[0]
    }

    /// The gradient of a scalar field.
    pub fn scalar_gradient(&self) -> SVector<T, D> {
        SVector::from_fn(|j, _| self.gradient[(0, j)])
    }

    /// The value of a field with `D` components.
    pub fn vector(&self) -> SVector<T, D> {
        SVector::from_fn(|i, _| self.value[i])
    }

    /// The gradient `du_i / dx_j` of a field with `D` components.
    pub fn vector_gradient(&self) -> SMatrix<T, D, D> {
        SMatrix::from_fn(|i, j| self.gradient[(i, j)])
    }
}

/// What an integrand returns at a quadrature point: the source term, tested against basis
/// values, and the flux, tested against basis gradients.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureResponse<T: Scalar, const D: usize> {
    pub source: DVector<T>,
    pub flux: FieldGradient<T, D>,
}

impl<T: Numeric, const D: usize> QuadratureResponse<T, D> {
    pub fn new(source: DVector<T>, flux: FieldGradient<T, D>) -> Self {
        Self { source, flux }
    }

    pub fn zeros(components: usize) -> Self {
        Self {
            source: DVector::zeros(components),
            flux: FieldGradient::zeros(components),
        }
    }

    /// Response for a scalar test field.
    pub fn scalar(source: T, flux: SVector<T, D>) -> Self {
        Self {
            source: DVector::from_element(1, source),
            flux: FieldGradient::from_fn(1, |_, j| flux[j]),
        }
    }

    /// Response for a test field with `D` components.
    pub fn vector(source: SVector<T, D>, flux: SMatrix<T, D, D>) -> Self {
        Self {
            source: DVector::from_fn(D, |i, _| source[i]),
            flux: FieldGradient::from_fn(D, |i, j| flux[(i, j)]),
        }
    }
}

/// A weak-form integrand over volume cells.
///
/// `evaluate` is called once per quadrature point per element, with the value and gradient of
/// every trial field the integral depends on, in dependency order. Uniform fields have zero
/// gradient. It must be written generically over [`Numeric`] so that it can be
/// evaluated with dual numbers when derivatives are requested.
///
/// `state` is the point's persistent state when quadrature data is attached to the integral,
/// and a fresh `Default` value otherwise. Mutations are only kept by committing evaluations.
pub trait Integrand<const D: usize>: Send + Sync {
    type State: Clone + Default + Send + Sync + 'static;

    fn evaluate<T: Numeric>(
        &self,
        x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        state: &mut Self::State,
    ) -> QuadratureResponse<T, D>;
}

/// A weak-form integrand over boundary faces.
///
/// Receives the values of the trial fields the integral depends on together with the unit
/// outward normal, and returns a source term tested against the basis values.
pub trait BoundaryIntegrand<const D: usize>: Send + Sync {
    fn evaluate<T: Numeric>(&self, x: &SVector<f64, D>, normal: &SVector<f64, D>, values: &[DVector<T>]) -> DVector<T>;
}
