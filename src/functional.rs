//! Weak-form functionals assembled from domain and boundary integrals.
//!
//! A [`Functional`] maps the dof vectors of its trial spaces to a vector in the dual of its test
//! space, `r_i = sum over integrals of integral(phi_i, u_1, ..., u_m)`. One trial argument may be
//! marked with [`differentiate_wrt`], in which case evaluation also returns the derivative of the
//! residual with respect to that argument as a [`FunctionalGradient`], which can be applied to
//! directions or assembled into a sparse matrix.
//!
//! Integrals receive the trial fields they depend on, by default all of them in order. Trial
//! spaces may be [uniform](FunctionSpace::uniform), in which case the field is a spatially
//! constant parameter.
mod integrand;
mod kernel;

pub use integrand::*;

use crate::domain::{BoundaryDomain, Domain};
use crate::error::ConfigurationError;
use crate::quadrature_data::QuadratureData;
use crate::settings::{AssemblySettings, ExecutionPolicy};
use crate::space::FunctionSpace;
use eyre::WrapErr;
use kernel::{BoundaryKernel, Context, DomainKernel, FieldBinding, Integral, Output, StateSnapshot, Triplets};
use log::{debug, trace};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// An argument passed to [`Functional::evaluate`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Input<'a> {
    Value(&'a [f64]),
    /// The argument the functional is differentiated with respect to.
    Differentiate(&'a [f64]),
}

impl<'a> Input<'a> {
    pub fn values(&self) -> &'a [f64] {
        match *self {
            Self::Value(values) | Self::Differentiate(values) => values,
        }
    }

    pub fn is_differentiated(&self) -> bool {
        matches!(self, Self::Differentiate(_))
    }
}

impl<'a> From<&'a [f64]> for Input<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::Value(values)
    }
}

impl<'a> From<&'a DVector<f64>> for Input<'a> {
    fn from(values: &'a DVector<f64>) -> Self {
        Self::Value(values.as_slice())
    }
}

/// Marks an argument of [`Functional::evaluate`] for differentiation.
pub fn differentiate_wrt(values: &[f64]) -> Input<'_> {
    Input::Differentiate(values)
}

/// A residual functional over one test space and any number of trial spaces.
pub struct Functional<const D: usize> {
    test: FunctionSpace,
    trials: Vec<FunctionSpace>,
    integrals: Vec<Box<dyn Integral<D>>>,
    settings: AssemblySettings,
    /// Whether residual evaluations commit the quadrature point states written by the
    /// integrands. Derivative evaluations never commit.
    pub update_qdata: bool,
}

impl<const D: usize> std::fmt::Debug for Functional<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Functional")
            .field("test", &self.test)
            .field("trials", &self.trials)
            .field("num_integrals", &self.integrals.len())
            .field("settings", &self.settings)
            .field("update_qdata", &self.update_qdata)
            .finish()
    }
}

impl<const D: usize> Functional<D> {
    pub fn new(test: FunctionSpace, trials: Vec<FunctionSpace>) -> Self {
        Self {
            test,
            trials,
            integrals: Vec::new(),
            settings: AssemblySettings::default(),
            update_qdata: false,
        }
    }

    pub fn with_settings(mut self, settings: AssemblySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AssemblySettings) {
        self.settings = settings;
    }

    pub fn test_space(&self) -> &FunctionSpace {
        &self.test
    }

    pub fn trial_spaces(&self) -> &[FunctionSpace] {
        &self.trials
    }

    pub fn num_integrals(&self) -> usize {
        self.integrals.len()
    }

    /// Registers an integral over the cells of `domain` that depends on every trial field.
    ///
    /// If `qdata` is given, it must hold one state per quadrature point of `domain`. The
    /// integrand then reads, and in committing evaluations writes, these states.
    pub fn add_domain_integral<I>(
        &mut self,
        integrand: I,
        domain: &Domain<D>,
        qdata: Option<QuadratureData<I::State>>,
    ) -> Result<(), ConfigurationError>
    where
        I: Integrand<D> + 'static,
    {
        let all_fields: Vec<usize> = (0..self.trials.len()).collect();
        self.add_dependent_domain_integral(&all_fields, integrand, domain, qdata)
    }

    /// Registers an integral over the cells of `domain` that only depends on the trial fields
    /// `depends_on`.
    ///
    /// The integrand receives the values of these fields in the given order. Its derivative with
    /// respect to any other field is zero.
    pub fn add_dependent_domain_integral<I>(
        &mut self,
        depends_on: &[usize],
        integrand: I,
        domain: &Domain<D>,
        qdata: Option<QuadratureData<I::State>>,
    ) -> Result<(), ConfigurationError>
    where
        I: Integrand<D> + 'static,
    {
        self.check_dependencies(depends_on)?;
        let num_elements = domain.num_elements();
        let bind = |space: &FunctionSpace| match space.restriction() {
            Some(restriction) => {
                FieldBinding::nodal(domain.geometry(), space.order(), domain.points(), restriction, num_elements)
            }
            None => Ok(FieldBinding::Uniform),
        };
        let test = bind(&self.test)?;
        let trials = depends_on
            .iter()
            .map(|&field| bind(&self.trials[field]))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(qdata) = &qdata {
            let expected = (num_elements, domain.points_per_element());
            let actual = (qdata.num_elements(), qdata.points_per_element());
            if expected != actual {
                return Err(ConfigurationError::QuadratureDataMismatch { expected, actual });
            }
        }

        trace!(
            "Registered domain integral over {} {:?} cells with {} points each, depending on fields {:?}",
            num_elements,
            domain.geometry(),
            domain.points_per_element(),
            depends_on
        );
        self.integrals.push(Box::new(DomainKernel {
            integrand,
            domain: domain.clone(),
            test,
            fields: depends_on.to_vec(),
            trials,
            qdata,
        }));
        Ok(())
    }

    /// Registers an integral over the faces of `boundary` that depends on every trial field.
    ///
    /// The test space and all nodal trial spaces need a boundary restriction for these faces.
    pub fn add_boundary_integral<I>(&mut self, integrand: I, boundary: &BoundaryDomain<D>) -> Result<(), ConfigurationError>
    where
        I: BoundaryIntegrand<D> + 'static,
    {
        let all_fields: Vec<usize> = (0..self.trials.len()).collect();
        self.add_dependent_boundary_integral(&all_fields, integrand, boundary)
    }

    /// Registers an integral over the faces of `boundary` that only depends on the trial fields
    /// `depends_on`.
    pub fn add_dependent_boundary_integral<I>(
        &mut self,
        depends_on: &[usize],
        integrand: I,
        boundary: &BoundaryDomain<D>,
    ) -> Result<(), ConfigurationError>
    where
        I: BoundaryIntegrand<D> + 'static,
    {
        self.check_dependencies(depends_on)?;
        let num_faces = boundary.num_faces();
        let bind = |field: usize, space: &FunctionSpace| {
            if space.is_uniform() {
                return Ok(FieldBinding::Uniform);
            }
            let restriction = space
                .boundary_restriction()
                .ok_or(ConfigurationError::MissingBoundaryRestriction { field })?;
            FieldBinding::nodal(boundary.geometry(), space.order(), boundary.points(), restriction, num_faces)
        };
        // The test space is reported as the field after the last trial field
        let test = bind(self.trials.len(), &self.test)?;
        let trials = depends_on
            .iter()
            .map(|&field| bind(field, &self.trials[field]))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            "Registered boundary integral over {} {:?} faces, depending on fields {:?}",
            num_faces,
            boundary.geometry(),
            depends_on
        );
        self.integrals.push(Box::new(BoundaryKernel {
            integrand,
            boundary: boundary.clone(),
            test,
            fields: depends_on.to_vec(),
            trials,
        }));
        Ok(())
    }

    fn check_dependencies(&self, depends_on: &[usize]) -> Result<(), ConfigurationError> {
        for (k, &field) in depends_on.iter().enumerate() {
            if field >= self.trials.len() || depends_on[..k].contains(&field) {
                return Err(ConfigurationError::InvalidDependency { field });
            }
        }
        Ok(())
    }

    /// Copies the quadrature point states of every integral.
    fn snapshot_states(&self) -> Vec<Option<StateSnapshot>> {
        self.integrals
            .iter()
            .map(|integral| integral.snapshot())
            .collect()
    }

    fn check_inputs(&self, inputs: &[&[f64]]) -> Result<(), ConfigurationError> {
        if inputs.len() != self.trials.len() {
            return Err(ConfigurationError::InputCount {
                expected: self.trials.len(),
                actual: inputs.len(),
            });
        }
        for (field, (space, input)) in self.trials.iter().zip(inputs).enumerate() {
            if input.len() != space.num_dofs() {
                return Err(ConfigurationError::InputLength {
                    field,
                    expected: space.num_dofs(),
                    actual: input.len(),
                });
            }
        }
        if let ExecutionPolicy::WorkGroup { block } = self.settings.execution {
            if block.num_threads() == 0 {
                return Err(ConfigurationError::EmptyBlock);
            }
        }
        for integral in &self.integrals {
            integral.supports(self.settings.execution)?;
        }
        Ok(())
    }

    fn context<'a>(&'a self, inputs: &'a [&'a [f64]]) -> Context<'a> {
        Context {
            test: &self.test,
            trials: &self.trials,
            inputs,
            execution: self.settings.execution,
        }
    }

    /// Assembles the residual for the given trial dof vectors.
    ///
    /// Commits quadrature point states if [`update_qdata`](Self::update_qdata) is set.
    pub fn residual(&self, inputs: &[&[f64]]) -> eyre::Result<DVector<f64>> {
        self.check_inputs(inputs)
            .wrap_err("cannot evaluate functional")?;
        debug!(
            "Assembling residual of {} integrals into {} dofs ({:?}, commit: {})",
            self.integrals.len(),
            self.test.num_dofs(),
            self.settings.execution,
            self.update_qdata
        );
        let ctx = self.context(inputs);
        let output = Output::new(self.settings.execution, self.test.num_dofs(), false);
        for integral in &self.integrals {
            integral.residual(&ctx, self.update_qdata, &output);
        }
        let (residual, _) = output.finish();
        Ok(residual)
    }

    /// Evaluates the residual and, if one argument is marked with [`differentiate_wrt`], its
    /// derivative with respect to that argument.
    pub fn evaluate<'a>(&'a self, inputs: &[Input<'_>]) -> eyre::Result<(DVector<f64>, Option<FunctionalGradient<'a, D>>)> {
        let mut differentiated = inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.is_differentiated())
            .map(|(field, _)| field);
        let wrt = differentiated.next();
        if differentiated.next().is_some() {
            return Err(ConfigurationError::MultipleDifferentiationArguments).wrap_err("cannot evaluate functional");
        }

        let values: Vec<&[f64]> = inputs.iter().map(Input::values).collect();
        // The gradient is taken at the states the residual sees, before they are committed
        let states = wrt.map(|_| self.snapshot_states());
        let residual = self.residual(&values)?;
        let gradient = wrt.zip(states).map(|(wrt, states)| FunctionalGradient {
            functional: self,
            inputs: values.iter().map(|v| v.to_vec()).collect(),
            states,
            wrt,
        });
        Ok((residual, gradient))
    }

    /// Evaluates the residual together with its derivative with respect to trial field `wrt`.
    ///
    /// Unlike [`evaluate`](Self::evaluate), quadrature point states are never committed.
    pub fn gradient<'a>(&'a self, inputs: &[&[f64]], wrt: usize) -> eyre::Result<(DVector<f64>, FunctionalGradient<'a, D>)> {
        self.check_inputs(inputs)
            .wrap_err("cannot differentiate functional")?;
        if wrt >= self.trials.len() {
            return Err(ConfigurationError::InputCount {
                expected: self.trials.len(),
                actual: wrt + 1,
            })
            .wrap_err("cannot differentiate functional");
        }
        let gradient = FunctionalGradient {
            functional: self,
            inputs: inputs.iter().map(|v| v.to_vec()).collect(),
            states: self.snapshot_states(),
            wrt,
        };
        let (residual, _) = gradient.linearize(&vec![0.0; self.trials[wrt].num_dofs()])?;
        Ok((residual, gradient))
    }
}

/// The derivative of a functional with respect to one of its trial arguments, linearized at a
/// fixed set of inputs.
///
/// The quadrature point states are captured when the gradient is created, so later commits do
/// not change it.
pub struct FunctionalGradient<'a, const D: usize> {
    functional: &'a Functional<D>,
    inputs: Vec<Vec<f64>>,
    states: Vec<Option<StateSnapshot>>,
    wrt: usize,
}

impl<'a, const D: usize> std::fmt::Debug for FunctionalGradient<'a, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionalGradient")
            .field("wrt", &self.wrt)
            .field("nrows", &self.nrows())
            .field("ncols", &self.ncols())
            .finish()
    }
}

impl<'a, const D: usize> FunctionalGradient<'a, D> {
    /// Index of the trial argument the derivative is taken with respect to.
    pub fn wrt(&self) -> usize {
        self.wrt
    }

    pub fn nrows(&self) -> usize {
        self.functional.test.num_dofs()
    }

    pub fn ncols(&self) -> usize {
        self.functional.trials[self.wrt].num_dofs()
    }

    fn linearize(&self, direction: &[f64]) -> eyre::Result<(DVector<f64>, DVector<f64>)> {
        if direction.len() != self.ncols() {
            return Err(ConfigurationError::InputLength {
                field: self.wrt,
                expected: self.ncols(),
                actual: direction.len(),
            })
            .wrap_err("cannot apply functional gradient");
        }
        let functional = self.functional;
        let inputs: Vec<&[f64]> = self.inputs.iter().map(Vec::as_slice).collect();
        let ctx = functional.context(&inputs);
        let output = Output::new(ctx.execution, self.nrows(), true);
        for (integral, states) in functional.integrals.iter().zip(&self.states) {
            integral.linearized(&ctx, states.as_ref(), self.wrt, direction, &output);
        }
        let (residual, derivative) = output.finish();
        let derivative = derivative.unwrap_or_else(|| DVector::zeros(self.nrows()));
        Ok((residual, derivative))
    }

    /// Computes the action `(dr/du) v` of the derivative on a direction `v`.
    pub fn apply(&self, direction: &[f64]) -> eyre::Result<DVector<f64>> {
        debug!("Applying gradient with respect to field {}", self.wrt);
        let (_, derivative) = self.linearize(direction)?;
        Ok(derivative)
    }

    /// Assembles the derivative into a sparse matrix by seeding one element dof at a time.
    pub fn assemble(&self) -> eyre::Result<CsrMatrix<f64>> {
        let functional = self.functional;
        debug!(
            "Assembling {}x{} gradient with respect to field {}",
            self.nrows(),
            self.ncols(),
            self.wrt
        );
        let inputs: Vec<&[f64]> = self.inputs.iter().map(Vec::as_slice).collect();
        let ctx = functional.context(&inputs);
        let triplets = Triplets::new();
        for (integral, states) in functional.integrals.iter().zip(&self.states) {
            trace!("Seeding {} elements", integral.num_cells());
            integral.jacobian(&ctx, states.as_ref(), self.wrt, &triplets);
        }
        let mut coo = CooMatrix::new(self.nrows(), self.ncols());
        for buffer in triplets.into_iter() {
            for (row, column, value) in buffer.into_inner() {
                coo.push(row, column, value);
            }
        }
        Ok(CsrMatrix::from(&coo))
    }
}
