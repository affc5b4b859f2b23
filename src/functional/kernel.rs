//! Element loops shared by domain and boundary integrals.
//!
//! Each integral is driven through the same three passes: a residual pass in plain `f64`, a
//! linearized pass that seeds a direction into the dual part of the trial dofs, and a Jacobian
//! pass that seeds one local trial dof at a time and records the resulting columns.
use super::integrand::{BoundaryIntegrand, FieldGradient, FieldValue, Integrand};
use crate::domain::{BoundaryDomain, Domain};
use crate::dual::Dual;
use crate::element::{Element, Family, FiniteElement};
use crate::error::ConfigurationError;
use crate::integrate::pull_back;
use crate::interpolate::{to_physical_gradients, QuadratureFields, SumFactorizationCache};
use crate::quadrature::Geometry;
use crate::quadrature_data::QuadratureData;
use crate::settings::ExecutionPolicy;
use crate::space::{ElementRestriction, FunctionSpace};
use crate::workgroup::{AtomicAccumulator, BlockDim, WorkGroup};
use crate::Numeric;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use itertools::Either;
use nalgebra::DVector;
use rayon::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use thread_local::ThreadLocal;

define_thread_local_workspace!(WORKSPACE);

/// Scalars the element loop can run with.
pub(crate) trait ElementScalar: Numeric {
    fn seeded(value: f64, derivative: f64) -> Self;

    fn derivative(&self) -> f64;
}

impl ElementScalar for f64 {
    fn seeded(value: f64, _derivative: f64) -> Self {
        value
    }

    fn derivative(&self) -> f64 {
        0.0
    }
}

impl ElementScalar for Dual<f64> {
    fn seeded(value: f64, derivative: f64) -> Self {
        Dual::new(value, derivative)
    }

    fn derivative(&self) -> f64 {
        self.gradient
    }
}

/// Which trial dofs carry a derivative seed.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Seed<'a> {
    None,
    Direction { field: usize, direction: &'a [f64] },
    LocalDof { field: usize, index: usize },
}

/// Everything an integral needs to know about the pass being run.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Context<'a> {
    pub test: &'a FunctionSpace,
    pub trials: &'a [FunctionSpace],
    pub inputs: &'a [&'a [f64]],
    pub execution: ExecutionPolicy,
}

/// A field as seen by the cells of one integral.
pub(crate) enum FieldBinding {
    Nodal {
        element: Element,
        restriction: ElementRestriction,
    },
    Uniform,
}

impl FieldBinding {
    /// Binds a nodal space of the given order to `num_cells` cells through `restriction`.
    pub fn nodal(
        geometry: Geometry,
        order: usize,
        points: usize,
        restriction: &ElementRestriction,
        num_cells: usize,
    ) -> Result<Self, ConfigurationError> {
        let element = Element::new(geometry, Family::H1, order, points)?;
        check_restriction(restriction, &element, num_cells)?;
        Ok(Self::Nodal {
            element,
            restriction: restriction.clone(),
        })
    }

    fn num_nodes(&self) -> usize {
        match self {
            Self::Nodal { element, .. } => element.num_nodes(),
            Self::Uniform => 1,
        }
    }

    fn gather(&self, cell: usize, components: usize, global: &[f64], local: &mut [f64]) {
        match self {
            Self::Nodal { restriction, .. } => restriction.gather(cell, components, global, local),
            Self::Uniform => local.copy_from_slice(&global[..components]),
        }
    }

    fn dof_indices(&self, cell: usize, components: usize) -> impl Iterator<Item = usize> + '_ {
        match self {
            Self::Nodal { restriction, .. } => Either::Left(restriction.dof_indices(cell, components)),
            Self::Uniform => Either::Right(0..components),
        }
    }
}

/// Sets every point of `fields` to the uniform values `dofs`, with zero gradient.
fn fill_uniform<T: Numeric>(fields: &mut QuadratureFields<T>, dofs: &[T]) {
    for point in 0..fields.num_points() {
        for (i, &value) in dofs.iter().enumerate() {
            fields.set_value(point, i, value);
        }
    }
}

/// Sums scaled sources over all points into a uniform residual.
fn sum_sources<T: Numeric>(sources: &QuadratureFields<T>, residual: &mut [T]) {
    for point in 0..sources.num_points() {
        for (i, r) in residual.iter_mut().enumerate() {
            *r += sources.value(point, i);
        }
    }
}

/// Quadrature point states of one integral captured when a gradient is created.
pub(crate) type StateSnapshot = Box<dyn Any + Send + Sync>;

/// Where an element loop takes its quadrature point states from.
enum States<'a, S> {
    /// The stored states, updated in place.
    Commit(&'a QuadratureData<S>),
    /// Read-only states, copied for every element.
    Frozen(&'a [S]),
    /// Fresh default states.
    Transient,
}

fn frozen<S: 'static>(snapshot: Option<&StateSnapshot>) -> States<'_, S> {
    match snapshot.and_then(|snapshot| (**snapshot).downcast_ref::<Vec<S>>()) {
        Some(stored) => States::Frozen(stored),
        None => States::Transient,
    }
}

enum Sink {
    PerThread(ThreadLocal<RefCell<Vec<f64>>>),
    Atomic(AtomicAccumulator),
}

/// Global output vector of a residual or linearized pass.
///
/// With derivatives, the buffer holds the values followed by the derivatives.
pub(crate) struct Output {
    len: usize,
    with_derivatives: bool,
    sink: Sink,
}

impl Output {
    pub fn new(execution: ExecutionPolicy, len: usize, with_derivatives: bool) -> Self {
        let total = if with_derivatives { 2 * len } else { len };
        let sink = match execution {
            ExecutionPolicy::WorkGroup { .. } => Sink::Atomic(AtomicAccumulator::new(total)),
            ExecutionPolicy::Serial | ExecutionPolicy::Parallel => Sink::PerThread(ThreadLocal::new()),
        };
        Self {
            len,
            with_derivatives,
            sink,
        }
    }

    fn total_len(&self) -> usize {
        if self.with_derivatives {
            2 * self.len
        } else {
            self.len
        }
    }

    fn add<T: ElementScalar>(&self, indices: impl Iterator<Item = usize>, local: &[T]) {
        match &self.sink {
            Sink::PerThread(buffers) => {
                let mut buffer = buffers
                    .get_or(|| RefCell::new(vec![0.0; self.total_len()]))
                    .borrow_mut();
                for (index, x) in indices.zip(local) {
                    buffer[index] += x.value();
                    if self.with_derivatives {
                        buffer[self.len + index] += x.derivative();
                    }
                }
            }
            Sink::Atomic(accumulator) => {
                for (index, x) in indices.zip(local) {
                    accumulator.add(index, x.value());
                    if self.with_derivatives {
                        accumulator.add(self.len + index, x.derivative());
                    }
                }
            }
        }
    }

    /// Reduces the per-thread buffers into the values and, if requested, the derivatives.
    pub fn finish(self) -> (DVector<f64>, Option<DVector<f64>>) {
        let total_len = self.total_len();
        let mut total = match self.sink {
            Sink::PerThread(buffers) => {
                buffers
                    .into_iter()
                    .map(RefCell::into_inner)
                    .fold(vec![0.0; total_len], |mut total, buffer| {
                        for (t, b) in total.iter_mut().zip(buffer) {
                            *t += b;
                        }
                        total
                    })
            }
            Sink::Atomic(accumulator) => accumulator.into_vec(),
        };
        if self.with_derivatives {
            let derivatives = total.split_off(self.len);
            (DVector::from_vec(total), Some(DVector::from_vec(derivatives)))
        } else {
            (DVector::from_vec(total), None)
        }
    }
}

/// Per-thread `(row, column, value)` buffers of a Jacobian pass.
pub(crate) type Triplets = ThreadLocal<RefCell<Vec<(usize, usize, f64)>>>;

/// Scratch buffers of the element kernels.
pub(crate) struct KernelWorkspace<T> {
    cache: SumFactorizationCache<T>,
    fields: Vec<QuadratureFields<T>>,
    response: QuadratureFields<T>,
    workgroup: Option<WorkGroup<T>>,
}

impl<T> Default for KernelWorkspace<T> {
    fn default() -> Self {
        Self {
            cache: SumFactorizationCache::default(),
            fields: Vec::new(),
            response: QuadratureFields::default(),
            workgroup: None,
        }
    }
}

impl<T: Numeric> KernelWorkspace<T> {
    fn workgroup(workgroup: &mut Option<WorkGroup<T>>, block: BlockDim) -> &mut WorkGroup<T> {
        if workgroup.as_ref().map(WorkGroup::block) != Some(block) {
            *workgroup = Some(WorkGroup::with_block(block));
        }
        workgroup.get_or_insert_with(|| WorkGroup::with_block(block))
    }
}

struct ElementWorkspace<T> {
    trial_dofs: Vec<Vec<T>>,
    values: Vec<f64>,
    derivatives: Vec<f64>,
    residual: Vec<T>,
    kernel: KernelWorkspace<T>,
}

impl<T> Default for ElementWorkspace<T> {
    fn default() -> Self {
        Self {
            trial_dofs: Vec::new(),
            values: Vec::new(),
            derivatives: Vec::new(),
            residual: Vec::new(),
            kernel: KernelWorkspace::default(),
        }
    }
}

/// The per-element computation of an integral.
pub(crate) trait ElementKernel<const D: usize>: Send + Sync {
    type State: Clone + Default + Send + Sync + 'static;

    fn num_elements(&self) -> usize;

    fn points_per_element(&self) -> usize;

    fn qdata(&self) -> Option<&QuadratureData<Self::State>>;

    fn test(&self) -> &FieldBinding;

    /// The trial fields the integral depends on, as indices into the trial spaces.
    fn fields(&self) -> &[usize];

    /// The binding of the trial field at position `slot` of [`fields`](Self::fields).
    fn trial(&self, slot: usize) -> &FieldBinding;

    fn check_execution(&self, execution: ExecutionPolicy) -> Result<(), ConfigurationError>;

    /// Accumulates the element residual for the given local trial dofs into `residual`.
    fn evaluate<T: ElementScalar>(
        &self,
        element: usize,
        trial_dofs: &[Vec<T>],
        states: &mut [Self::State],
        execution: ExecutionPolicy,
        ws: &mut KernelWorkspace<T>,
        residual: &mut [T],
    );
}

/// An integral as seen by the functional.
pub(crate) trait Integral<const D: usize>: Send + Sync {
    fn num_cells(&self) -> usize;

    fn supports(&self, execution: ExecutionPolicy) -> Result<(), ConfigurationError>;

    /// Copies the current quadrature point states, if the integral has any.
    fn snapshot(&self) -> Option<StateSnapshot>;

    fn residual(&self, ctx: &Context<'_>, commit: bool, output: &Output);

    fn linearized(
        &self,
        ctx: &Context<'_>,
        snapshot: Option<&StateSnapshot>,
        field: usize,
        direction: &[f64],
        output: &Output,
    );

    fn jacobian(&self, ctx: &Context<'_>, snapshot: Option<&StateSnapshot>, field: usize, triplets: &Triplets);
}

impl<K, const D: usize> Integral<D> for K
where
    K: ElementKernel<D>,
{
    fn num_cells(&self) -> usize {
        ElementKernel::num_elements(self)
    }

    fn supports(&self, execution: ExecutionPolicy) -> Result<(), ConfigurationError> {
        ElementKernel::check_execution(self, execution)
    }

    fn snapshot(&self) -> Option<StateSnapshot> {
        self.qdata()
            .map(|qdata| Box::new(qdata.read().to_vec()) as StateSnapshot)
    }

    fn residual(&self, ctx: &Context<'_>, commit: bool, output: &Output) {
        match self.qdata() {
            Some(qdata) if commit => assemble_vector::<K, f64, D>(self, ctx, Seed::None, States::Commit(qdata), output),
            Some(qdata) => {
                let stored = qdata.read();
                assemble_vector::<K, f64, D>(self, ctx, Seed::None, States::Frozen(stored.as_slice()), output);
            }
            None => assemble_vector::<K, f64, D>(self, ctx, Seed::None, States::Transient, output),
        }
    }

    fn linearized(
        &self,
        ctx: &Context<'_>,
        snapshot: Option<&StateSnapshot>,
        field: usize,
        direction: &[f64],
        output: &Output,
    ) {
        let seed = Seed::Direction { field, direction };
        assemble_vector::<K, Dual<f64>, D>(self, ctx, seed, frozen(snapshot), output);
    }

    fn jacobian(&self, ctx: &Context<'_>, snapshot: Option<&StateSnapshot>, field: usize, triplets: &Triplets) {
        assemble_jacobian::<K, D>(self, ctx, frozen(snapshot), field, triplets);
    }
}

/// Runs `process` for every element with the quadrature point states of that element.
///
/// Committing passes hold the write lock for the whole pass and hand out disjoint slices of the
/// stored states. Otherwise every element works on a private copy that is discarded.
fn for_each_element<K, F, const D: usize>(kernel: &K, parallel: bool, states: States<'_, K::State>, process: F)
where
    K: ElementKernel<D>,
    F: Fn(usize, &mut [K::State]) + Send + Sync,
{
    let num_elements = kernel.num_elements();
    let nq = kernel.points_per_element();
    let stored = match states {
        States::Commit(qdata) => {
            let mut states = qdata.write();
            if parallel {
                states
                    .par_chunks_mut(nq)
                    .enumerate()
                    .for_each(|(element, states)| process(element, states));
            } else {
                states
                    .chunks_mut(nq)
                    .enumerate()
                    .for_each(|(element, states)| process(element, states));
            }
            return;
        }
        States::Frozen(stored) => Some(stored),
        States::Transient => None,
    };
    let run = |element: usize| {
        let mut states = match stored {
            Some(stored) => stored[nq * element..nq * (element + 1)].to_vec(),
            None => vec![K::State::default(); nq],
        };
        process(element, &mut states);
    };
    if parallel {
        (0..num_elements).into_par_iter().for_each(run);
    } else {
        (0..num_elements).for_each(run);
    }
}

/// Gathers the local dofs of the trial fields `element` depends on and seeds their dual parts.
fn gather<K, T, const D: usize>(kernel: &K, ctx: &Context<'_>, element: usize, seed: Seed<'_>, ws: &mut ElementWorkspace<T>)
where
    K: ElementKernel<D>,
    T: ElementScalar,
{
    let fields = kernel.fields();
    ws.trial_dofs.resize_with(fields.len(), Vec::new);
    for (slot, &field) in fields.iter().enumerate() {
        let binding = kernel.trial(slot);
        let components = ctx.trials[field].components();
        let len = components * binding.num_nodes();
        ws.values.resize(len, 0.0);
        binding.gather(element, components, ctx.inputs[field], &mut ws.values);

        ws.derivatives.clear();
        ws.derivatives.resize(len, 0.0);
        match seed {
            Seed::Direction { field: seeded, direction } if seeded == field => {
                binding.gather(element, components, direction, &mut ws.derivatives);
            }
            Seed::LocalDof { field: seeded, index } if seeded == field => ws.derivatives[index] = 1.0,
            _ => {}
        }

        let dofs = &mut ws.trial_dofs[slot];
        dofs.clear();
        dofs.extend(
            ws.values
                .iter()
                .zip(&ws.derivatives)
                .map(|(&value, &derivative)| T::seeded(value, derivative)),
        );
    }
}

fn evaluate_element<K, T, const D: usize>(
    kernel: &K,
    ctx: &Context<'_>,
    element: usize,
    seed: Seed<'_>,
    states: &mut [K::State],
    ws: &mut ElementWorkspace<T>,
) where
    K: ElementKernel<D>,
    T: ElementScalar,
{
    gather(kernel, ctx, element, seed, ws);
    let len = ctx.test.components() * kernel.test().num_nodes();
    ws.residual.clear();
    ws.residual.resize(len, T::zero());
    kernel.evaluate(element, &ws.trial_dofs, states, ctx.execution, &mut ws.kernel, &mut ws.residual);
}

fn assemble_vector<K, T, const D: usize>(
    kernel: &K,
    ctx: &Context<'_>,
    seed: Seed<'_>,
    states: States<'_, K::State>,
    output: &Output,
) where
    K: ElementKernel<D>,
    T: ElementScalar,
{
    let test = kernel.test();
    let components = ctx.test.components();
    for_each_element(kernel, ctx.execution.is_parallel(), states, |element, states| {
        with_thread_local_workspace(&WORKSPACE, |ws: &mut ElementWorkspace<T>| {
            evaluate_element(kernel, ctx, element, seed, states, ws);
            output.add(test.dof_indices(element, components), &ws.residual);
        })
    });
}

fn assemble_jacobian<K, const D: usize>(
    kernel: &K,
    ctx: &Context<'_>,
    states: States<'_, K::State>,
    field: usize,
    triplets: &Triplets,
) where
    K: ElementKernel<D>,
{
    // Integrals that do not depend on the field contribute nothing
    let slot = match kernel.fields().iter().position(|&f| f == field) {
        Some(slot) => slot,
        None => return,
    };
    let test = kernel.test();
    let trial = kernel.trial(slot);
    let test_components = ctx.test.components();
    let trial_components = ctx.trials[field].components();
    for_each_element(kernel, ctx.execution.is_parallel(), states, |element, states| {
        let rows: Vec<usize> = test.dof_indices(element, test_components).collect();
        let columns: Vec<usize> = trial.dof_indices(element, trial_components).collect();
        let initial = states.to_vec();
        let mut local = triplets.get_or(|| RefCell::new(Vec::new())).borrow_mut();
        for (index, &column) in columns.iter().enumerate() {
            states.clone_from_slice(&initial);
            with_thread_local_workspace(&WORKSPACE, |ws: &mut ElementWorkspace<Dual<f64>>| {
                let seed = Seed::LocalDof { field, index };
                evaluate_element(kernel, ctx, element, seed, states, ws);
                local.extend(
                    rows.iter()
                        .zip(&ws.residual)
                        .map(|(&row, r)| (row, column, r.gradient)),
                );
            });
        }
    });
}

/// Checks that `restriction` matches the element and the number of cells it is used with.
fn check_restriction(
    restriction: &ElementRestriction,
    element: &Element,
    num_elements: usize,
) -> Result<(), ConfigurationError> {
    if restriction.nodes_per_element() != element.num_nodes() {
        return Err(ConfigurationError::NodeCountMismatch {
            expected: element.num_nodes(),
            actual: restriction.nodes_per_element(),
        });
    }
    if restriction.num_elements() != num_elements {
        return Err(ConfigurationError::ElementCountMismatch {
            expected: num_elements,
            actual: restriction.num_elements(),
        });
    }
    Ok(())
}

pub(crate) struct DomainKernel<I: Integrand<D>, const D: usize> {
    pub integrand: I,
    pub domain: Domain<D>,
    pub test: FieldBinding,
    pub fields: Vec<usize>,
    pub trials: Vec<FieldBinding>,
    pub qdata: Option<QuadratureData<I::State>>,
}

impl<I: Integrand<D>, const D: usize> DomainKernel<I, D> {
    fn work_group_block(&self, execution: ExecutionPolicy) -> Option<BlockDim> {
        match execution {
            ExecutionPolicy::WorkGroup { block } if self.domain.geometry() == Geometry::Hexahedron => Some(block),
            _ => None,
        }
    }
}

impl<I: Integrand<D>, const D: usize> ElementKernel<D> for DomainKernel<I, D> {
    type State = I::State;

    fn num_elements(&self) -> usize {
        self.domain.num_elements()
    }

    fn points_per_element(&self) -> usize {
        self.domain.points_per_element()
    }

    fn qdata(&self) -> Option<&QuadratureData<Self::State>> {
        self.qdata.as_ref()
    }

    fn test(&self) -> &FieldBinding {
        &self.test
    }

    fn fields(&self) -> &[usize] {
        &self.fields
    }

    fn trial(&self, slot: usize) -> &FieldBinding {
        &self.trials[slot]
    }

    fn check_execution(&self, execution: ExecutionPolicy) -> Result<(), ConfigurationError> {
        match execution {
            ExecutionPolicy::WorkGroup { .. } if self.domain.geometry() != Geometry::Hexahedron => {
                Err(ConfigurationError::UnsupportedExecution {
                    geometry: self.domain.geometry(),
                })
            }
            _ => Ok(()),
        }
    }

    fn evaluate<T: ElementScalar>(
        &self,
        element: usize,
        trial_dofs: &[Vec<T>],
        states: &mut [Self::State],
        execution: ExecutionPolicy,
        ws: &mut KernelWorkspace<T>,
        residual: &mut [T],
    ) {
        let nq = self.domain.points_per_element();
        let jacobians = self.domain.element_jacobians(element);
        let block = self.work_group_block(execution);

        ws.fields.resize_with(self.trials.len(), QuadratureFields::default);
        for ((binding, dofs), fields) in self.trials.iter().zip(trial_dofs).zip(&mut ws.fields) {
            fields.reset(nq, dofs.len() / binding.num_nodes(), D);
            match binding {
                FieldBinding::Uniform => fill_uniform(fields, dofs),
                FieldBinding::Nodal { element: trial, .. } => match (block, trial.as_tensor_product()) {
                    (Some(block), Some(tensor)) => {
                        let group = KernelWorkspace::workgroup(&mut ws.workgroup, block);
                        group.interpolate_hexahedron(tensor.table(), dofs, fields);
                        to_physical_gradients(fields, jacobians);
                    }
                    _ => trial.interpolate(dofs, jacobians, fields, &mut ws.cache),
                },
            }
        }

        let test_components = residual.len() / self.test.num_nodes();
        ws.response.reset(nq, test_components, D);
        let mut values = Vec::with_capacity(ws.fields.len());
        for (point, state) in states.iter_mut().enumerate() {
            values.clear();
            values.extend(ws.fields.iter().map(|fields| field_value(fields, point)));
            let response = self
                .integrand
                .evaluate(self.domain.position(element, point), &values, state);
            assert_eq!(
                response.source.len(),
                test_components,
                "integrand returned a source with the wrong number of components"
            );
            assert_eq!(
                response.flux.nrows(),
                test_components,
                "integrand returned a flux with the wrong number of components"
            );
            for i in 0..test_components {
                ws.response.set_value(point, i, response.source[i]);
                for j in 0..D {
                    ws.response.set_gradient(point, i, j, response.flux[(i, j)]);
                }
            }
        }

        match &self.test {
            FieldBinding::Uniform => {
                // Fluxes are tested against constants and drop out
                pull_back(&mut ws.response, jacobians, self.domain.weights());
                sum_sources(&ws.response, residual);
            }
            FieldBinding::Nodal { element: test, .. } => match (block, test.as_tensor_product()) {
                (Some(block), Some(tensor)) => {
                    pull_back(&mut ws.response, jacobians, self.domain.weights());
                    let group = KernelWorkspace::workgroup(&mut ws.workgroup, block);
                    group.integrate_hexahedron(tensor.table(), &ws.response, residual);
                }
                _ => test.integrate(&mut ws.response, jacobians, residual, &mut ws.cache),
            },
        }
    }
}

fn field_value<T: Numeric, const D: usize>(fields: &QuadratureFields<T>, point: usize) -> FieldValue<T, D> {
    let components = fields.components();
    FieldValue {
        value: DVector::from_column_slice(fields.point_values(point)),
        gradient: FieldGradient::from_fn(components, |i, j| fields.gradient(point, i, j)),
    }
}

pub(crate) struct BoundaryKernel<I: BoundaryIntegrand<D>, const D: usize> {
    pub integrand: I,
    pub boundary: BoundaryDomain<D>,
    pub test: FieldBinding,
    pub fields: Vec<usize>,
    pub trials: Vec<FieldBinding>,
}

impl<I: BoundaryIntegrand<D>, const D: usize> ElementKernel<D> for BoundaryKernel<I, D> {
    type State = ();

    fn num_elements(&self) -> usize {
        self.boundary.num_faces()
    }

    fn points_per_element(&self) -> usize {
        self.boundary.points_per_face()
    }

    fn qdata(&self) -> Option<&QuadratureData<()>> {
        None
    }

    fn test(&self) -> &FieldBinding {
        &self.test
    }

    fn fields(&self) -> &[usize] {
        &self.fields
    }

    fn trial(&self, slot: usize) -> &FieldBinding {
        &self.trials[slot]
    }

    fn check_execution(&self, _execution: ExecutionPolicy) -> Result<(), ConfigurationError> {
        // Faces always run the CPU kernels, also under work-group execution
        Ok(())
    }

    fn evaluate<T: ElementScalar>(
        &self,
        face: usize,
        trial_dofs: &[Vec<T>],
        _states: &mut [()],
        _execution: ExecutionPolicy,
        ws: &mut KernelWorkspace<T>,
        residual: &mut [T],
    ) {
        let nq = self.boundary.points_per_face();
        let face_dim = self.boundary.geometry().dimension();
        ws.fields.resize_with(self.trials.len(), QuadratureFields::default);
        for ((binding, dofs), fields) in self.trials.iter().zip(trial_dofs).zip(&mut ws.fields) {
            fields.reset(nq, dofs.len() / binding.num_nodes(), face_dim);
            match binding {
                FieldBinding::Uniform => fill_uniform(fields, dofs),
                FieldBinding::Nodal { element: trial, .. } => trial.interpolate_values(dofs, fields, &mut ws.cache),
            }
        }

        let test_components = residual.len() / self.test.num_nodes();
        ws.response.reset(nq, test_components, face_dim);
        let measures = self.boundary.face_measures(face);
        let mut values = Vec::with_capacity(ws.fields.len());
        for (point, &measure) in measures.iter().enumerate() {
            values.clear();
            values.extend(
                ws.fields
                    .iter()
                    .map(|fields| DVector::from_column_slice(fields.point_values(point))),
            );
            let source = self.integrand.evaluate(
                self.boundary.position(face, point),
                self.boundary.normal(face, point),
                &values,
            );
            assert_eq!(
                source.len(),
                test_components,
                "boundary integrand returned a source with the wrong number of components"
            );
            for i in 0..test_components {
                ws.response.set_value(point, i, source[i] * measure);
            }
        }
        match &self.test {
            FieldBinding::Uniform => sum_sources(&ws.response, residual),
            FieldBinding::Nodal { element: test, .. } => test.integrate_sources(&ws.response, residual, &mut ws.cache),
        }
    }
}
