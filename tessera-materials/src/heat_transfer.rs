//! Thermal conduction.
//!
//! The residual of the heat equation is
//! `r(v) = (rho c_p du/dt, v) + (-q(u), grad v) - (s, v) - <f, v>`,
//! where `q` is the heat flux of the material, `s` a volumetric source and `f` the heat flux
//! entering through the boundary.
use crate::error::{check_density, MaterialError};
use serde::{Deserialize, Serialize};
use tessera::functional::{BoundaryIntegrand, FieldValue, Integrand, QuadratureResponse};
use tessera::nalgebra::{DVector, SMatrix, SVector};
use tessera::Numeric;

/// A conducting material.
pub trait ThermalMaterial<const D: usize>: Send + Sync {
    fn density(&self) -> f64;

    fn specific_heat(&self) -> f64;

    /// The heat flux `q` for the given temperature and temperature gradient.
    fn heat_flux<T: Numeric>(&self, x: &SVector<f64, D>, temperature: T, gradient: &SVector<T, D>) -> SVector<T, D>;
}

/// Fourier's law with a scalar conductivity.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearIsotropicConductor {
    density: f64,
    specific_heat: f64,
    conductivity: f64,
}

impl Default for LinearIsotropicConductor {
    fn default() -> Self {
        Self {
            density: 1.0,
            specific_heat: 1.0,
            conductivity: 1.0,
        }
    }
}

impl LinearIsotropicConductor {
    pub fn new(density: f64, specific_heat: f64, conductivity: f64) -> Result<Self, MaterialError> {
        check_density(density)?;
        if !(specific_heat >= 0.0) {
            return Err(MaterialError::NegativeSpecificHeat(specific_heat));
        }
        if !(conductivity >= 0.0) {
            return Err(MaterialError::NegativeConductivity(conductivity));
        }
        Ok(Self {
            density,
            specific_heat,
            conductivity,
        })
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    pub fn conductivity(&self) -> f64 {
        self.conductivity
    }
}

impl<const D: usize> ThermalMaterial<D> for LinearIsotropicConductor {
    fn density(&self) -> f64 {
        self.density
    }

    fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    fn heat_flux<T: Numeric>(&self, _x: &SVector<f64, D>, _temperature: T, gradient: &SVector<T, D>) -> SVector<T, D> {
        gradient.map(|g| -g * self.conductivity)
    }
}

/// Fourier's law with an anisotropic conductivity tensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearConductor<const D: usize> {
    density: f64,
    specific_heat: f64,
    conductivity: SMatrix<f64, D, D>,
}

impl<const D: usize> LinearConductor<D> {
    pub fn new(density: f64, specific_heat: f64, conductivity: SMatrix<f64, D, D>) -> Result<Self, MaterialError> {
        check_density(density)?;
        if !(specific_heat >= 0.0) {
            return Err(MaterialError::NegativeSpecificHeat(specific_heat));
        }
        let asymmetry = (conductivity - conductivity.transpose()).amax();
        if asymmetry > 1e-12 * conductivity.amax() || conductivity.cholesky().is_none() {
            return Err(MaterialError::IndefiniteConductivity);
        }
        Ok(Self {
            density,
            specific_heat,
            conductivity,
        })
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    pub fn conductivity(&self) -> &SMatrix<f64, D, D> {
        &self.conductivity
    }
}

impl<const D: usize> ThermalMaterial<D> for LinearConductor<D> {
    fn density(&self) -> f64 {
        self.density
    }

    fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    fn heat_flux<T: Numeric>(&self, _x: &SVector<f64, D>, _temperature: T, gradient: &SVector<T, D>) -> SVector<T, D> {
        SVector::from_fn(|i, _| {
            (0..D).fold(T::zero(), |acc, j| acc - gradient[j] * self.conductivity[(i, j)])
        })
    }
}

/// A volumetric heat source.
pub trait HeatSource<const D: usize>: Send + Sync {
    fn source<T: Numeric>(&self, x: &SVector<f64, D>, temperature: T, gradient: &SVector<T, D>) -> T;
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantSource {
    pub source: f64,
}

impl<const D: usize> HeatSource<D> for ConstantSource {
    fn source<T: Numeric>(&self, _x: &SVector<f64, D>, _temperature: T, _gradient: &SVector<T, D>) -> T {
        T::from_f64(self.source)
    }
}

/// Heat flux entering through the boundary.
pub trait BoundaryFlux<const D: usize>: Send + Sync {
    fn flux<T: Numeric>(&self, x: &SVector<f64, D>, normal: &SVector<f64, D>, temperature: T) -> T;
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantFlux {
    pub flux: f64,
}

impl<const D: usize> BoundaryFlux<D> for ConstantFlux {
    fn flux<T: Numeric>(&self, _x: &SVector<f64, D>, _normal: &SVector<f64, D>, _temperature: T) -> T {
        T::from_f64(self.flux)
    }
}

/// Conduction and heat storage.
///
/// Expects the temperature as first trial field. If a second field is given, it is taken as the
/// temperature rate and contributes the storage term `rho c_p du/dt`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ThermalConduction<M> {
    pub material: M,
}

impl<M> ThermalConduction<M> {
    pub fn new(material: M) -> Self {
        Self { material }
    }
}

impl<M: ThermalMaterial<D>, const D: usize> Integrand<D> for ThermalConduction<M> {
    type State = ();

    fn evaluate<T: Numeric>(
        &self,
        x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        _state: &mut (),
    ) -> QuadratureResponse<T, D> {
        let temperature = fields[0].scalar();
        let gradient = fields[0].scalar_gradient();
        let heat_capacity = self.material.density() * self.material.specific_heat();
        let storage = fields
            .get(1)
            .map(|rate| rate.scalar() * heat_capacity)
            .unwrap_or_else(T::zero);
        let flux = self.material.heat_flux(x, temperature, &gradient);
        QuadratureResponse::scalar(storage, -flux)
    }
}

/// A volumetric heat source term.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ThermalSource<S> {
    pub source: S,
}

impl<S> ThermalSource<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: HeatSource<D>, const D: usize> Integrand<D> for ThermalSource<S> {
    type State = ();

    fn evaluate<T: Numeric>(
        &self,
        x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        _state: &mut (),
    ) -> QuadratureResponse<T, D> {
        let s = self
            .source
            .source(x, fields[0].scalar(), &fields[0].scalar_gradient());
        QuadratureResponse::scalar(-s, SVector::zeros())
    }
}

/// A prescribed heat flux into the domain through its boundary.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ThermalBoundaryFlux<F> {
    pub flux: F,
}

impl<F> ThermalBoundaryFlux<F> {
    pub fn new(flux: F) -> Self {
        Self { flux }
    }
}

impl<F: BoundaryFlux<D>, const D: usize> BoundaryIntegrand<D> for ThermalBoundaryFlux<F> {
    fn evaluate<T: Numeric>(&self, x: &SVector<f64, D>, normal: &SVector<f64, D>, values: &[DVector<T>]) -> DVector<T> {
        let f = self.flux.flux(x, normal, values[0][0]);
        DVector::from_element(1, -f)
    }
}
