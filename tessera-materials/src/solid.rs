//! Solid mechanics in the total Lagrangian setting.
//!
//! Materials return the Kirchhoff stress as a function of the displacement gradient. The
//! [`SolidMechanics`] integrand pulls it back to the first Piola-Kirchhoff stress when geometric
//! nonlinearity is enabled, and uses it directly as the small-strain stress otherwise.
use crate::error::{check_density, MaterialError};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use tessera::functional::{BoundaryIntegrand, FieldValue, Integrand, QuadratureResponse};
use tessera::nalgebra::{DVector, SMatrix, SVector};
use tessera::tensor::{det, identity, inv, sym, trace};
use tessera::Numeric;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LameParameters {
    pub mu: f64,
    pub lambda: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YoungPoisson {
    pub young: f64,
    pub poisson: f64,
}

impl From<YoungPoisson> for LameParameters {
    fn from(params: YoungPoisson) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

impl LameParameters {
    pub fn bulk_modulus(&self) -> f64 {
        self.lambda + 2.0 * self.mu / 3.0
    }

    fn validate(self) -> Result<Self, MaterialError> {
        if !(self.mu > 0.0) {
            return Err(MaterialError::NonPositiveShearModulus(self.mu));
        }
        if !(self.bulk_modulus() > 0.0) {
            return Err(MaterialError::NonPositiveBulkModulus(self.bulk_modulus()));
        }
        Ok(self)
    }
}

/// A solid material.
pub trait SolidMaterial<const D: usize>: Send + Sync {
    /// Internal variables stored per quadrature point.
    type State: Clone + Default + Send + Sync + 'static;

    fn density(&self) -> f64;

    /// The Kirchhoff stress for the displacement gradient `du_dx`.
    fn stress<T: Numeric>(&self, state: &mut Self::State, du_dx: &SMatrix<T, D, D>) -> SMatrix<T, D, D>;
}

/// Hooke's law for small strains.
///
/// `sigma = lambda tr(eps) I + 2 mu eps`, with `eps = sym(grad u)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearIsotropicElasticity {
    density: f64,
    lame: LameParameters,
}

impl LinearIsotropicElasticity {
    pub fn new(density: f64, parameters: impl Into<LameParameters>) -> Result<Self, MaterialError> {
        check_density(density)?;
        Ok(Self {
            density,
            lame: parameters.into().validate()?,
        })
    }

    pub fn parameters(&self) -> &LameParameters {
        &self.lame
    }
}

impl<const D: usize> SolidMaterial<D> for LinearIsotropicElasticity {
    type State = ();

    fn density(&self) -> f64 {
        self.density
    }

    #[replace_float_literals(T::from_f64(literal))]
    fn stress<T: Numeric>(&self, _state: &mut (), du_dx: &SMatrix<T, D, D>) -> SMatrix<T, D, D> {
        let LameParameters { mu, lambda } = self.lame;
        let eps = sym(du_dx);
        let volumetric = trace(&eps) * lambda;
        SMatrix::from_fn(|i, j| {
            let diagonal = if i == j { volumetric } else { 0.0 };
            eps[(i, j)] * 2.0 * mu + diagonal
        })
    }
}

/// Compressible Neo-Hookean material.
///
/// `tau = mu (B - I) + lambda ln(J) I`, with `B = F F^T` and `J = det F`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeoHookean {
    density: f64,
    lame: LameParameters,
}

impl NeoHookean {
    pub fn new(density: f64, parameters: impl Into<LameParameters>) -> Result<Self, MaterialError> {
        check_density(density)?;
        Ok(Self {
            density,
            lame: parameters.into().validate()?,
        })
    }

    pub fn parameters(&self) -> &LameParameters {
        &self.lame
    }
}

impl<const D: usize> SolidMaterial<D> for NeoHookean {
    type State = ();

    fn density(&self) -> f64 {
        self.density
    }

    #[allow(non_snake_case)]
    fn stress<T: Numeric>(&self, _state: &mut (), du_dx: &SMatrix<T, D, D>) -> SMatrix<T, D, D> {
        let LameParameters { mu, lambda } = self.lame;
        let I = identity::<T, D>();
        let F = du_dx + I;
        let B = F * F.transpose();
        let ln_J = det(&F).ln();
        (B - I).map(|b| b * mu) + I.map(|i| i * ln_J * lambda)
    }
}

/// Momentum balance `rho a - div P = b`.
///
/// The displacement is the first trial field; a second field, if present, is the acceleration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidMechanics<M, const D: usize> {
    pub material: M,
    pub body_force: SVector<f64, D>,
    pub geometric_nonlinearity: bool,
}

impl<M, const D: usize> SolidMechanics<M, D> {
    pub fn new(material: M) -> Self {
        Self {
            material,
            body_force: SVector::zeros(),
            geometric_nonlinearity: true,
        }
    }

    pub fn with_body_force(mut self, body_force: SVector<f64, D>) -> Self {
        self.body_force = body_force;
        self
    }

    pub fn with_geometric_nonlinearity(mut self, enabled: bool) -> Self {
        self.geometric_nonlinearity = enabled;
        self
    }
}

impl<M: SolidMaterial<D>, const D: usize> Integrand<D> for SolidMechanics<M, D> {
    type State = M::State;

    #[allow(non_snake_case)]
    fn evaluate<T: Numeric>(
        &self,
        _x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        state: &mut M::State,
    ) -> QuadratureResponse<T, D> {
        let du_dx = fields[0].vector_gradient();
        let density = self.material.density();
        let inertia = fields
            .get(1)
            .map(|acceleration| acceleration.vector().map(|a| a * density))
            .unwrap_or_else(SVector::zeros);
        let mut source = inertia - self.body_force.map(T::from_f64);
        let mut stress = self.material.stress(state, &du_dx);

        if self.geometric_nonlinearity {
            let F = du_dx + identity::<T, D>();
            let J = det(&F);
            source = source.map(|s| s * J);
            stress = stress * inv(&F).transpose();
        }
        QuadratureResponse::vector(source, stress)
    }
}

/// A prescribed traction `t(x, n)` on the boundary.
#[derive(Debug, Clone, Copy)]
pub struct Traction<F> {
    pub traction: F,
}

impl<F> Traction<F> {
    pub fn new(traction: F) -> Self {
        Self { traction }
    }
}

impl<F, const D: usize> BoundaryIntegrand<D> for Traction<F>
where
    F: Fn(&SVector<f64, D>, &SVector<f64, D>) -> SVector<f64, D> + Send + Sync,
{
    fn evaluate<T: Numeric>(&self, x: &SVector<f64, D>, normal: &SVector<f64, D>, _values: &[DVector<T>]) -> DVector<T> {
        let t = (self.traction)(x, normal);
        DVector::from_fn(D, |i, _| T::from_f64(-t[i]))
    }
}
