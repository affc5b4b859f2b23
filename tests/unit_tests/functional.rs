use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use tessera::calculus::approximate_jacobian_fd;
use tessera::functional::{
    differentiate_wrt, BoundaryIntegrand, FieldValue, Functional, Input, Integrand, QuadratureResponse,
};
use tessera::nalgebra::{dvector, DMatrix, DVector, SVector};
use tessera::procedural::{Side, StructuredGrid};
use tessera::quadrature::Geometry;
use tessera::quadrature_data::QuadratureData;
use tessera::settings::{AssemblySettings, ExecutionPolicy};
use tessera::space::FunctionSpace;
use tessera::workgroup::BlockDim;
use tessera::{ConfigurationError, Numeric};

/// `-div(k grad u)`.
#[derive(Debug, Copy, Clone)]
struct Diffusion {
    conductivity: f64,
}

impl<const D: usize> Integrand<D> for Diffusion {
    type State = ();

    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        let flux = fields[0].scalar_gradient().map(|g| g * self.conductivity);
        QuadratureResponse::scalar(T::zero(), flux)
    }
}

#[derive(Debug, Copy, Clone)]
struct Mass;

impl<const D: usize> Integrand<D> for Mass {
    type State = ();

    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        QuadratureResponse::scalar(fields[0].scalar(), SVector::zeros())
    }
}

/// `-div((1 + u^2) grad u) + u^3 + x_0 sin(u)`.
#[derive(Debug, Copy, Clone)]
struct Nonlinear;

impl<const D: usize> Integrand<D> for Nonlinear {
    type State = ();

    fn evaluate<T: Numeric>(&self, x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        let u = fields[0].scalar();
        let diffusivity = u * u + 1.0;
        let source = u.powi(3) + u.sin() * x[0];
        QuadratureResponse::scalar(source, fields[0].scalar_gradient().map(|g| g * diffusivity))
    }
}

/// A scalar equation driven by a vector field, `u (v . v) + v_0` tested against values and
/// `grad u + u v` against gradients.
#[derive(Debug, Copy, Clone)]
struct Coupled;

impl<const D: usize> Integrand<D> for Coupled {
    type State = ();

    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        let u = fields[0].scalar();
        let v = fields[1].vector();
        let source = u * v.dot(&v) + v[0];
        let flux = fields[0].scalar_gradient() + v.map(|v_i| v_i * u);
        QuadratureResponse::scalar(source, flux)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Counter {
    evaluations: usize,
    last: f64,
}

/// A mass term scaled by the number of times the point has been evaluated, including this one.
#[derive(Debug, Copy, Clone)]
struct CountingMass;

impl<const D: usize> Integrand<D> for CountingMass {
    type State = Counter;

    fn evaluate<T: Numeric>(
        &self,
        _x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        state: &mut Counter,
    ) -> QuadratureResponse<T, D> {
        state.evaluations += 1;
        state.last = fields[0].scalar().value();
        QuadratureResponse::scalar(fields[0].scalar() * state.evaluations as f64, SVector::zeros())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Memory {
    previous: f64,
}

/// `-div((1 + p^2) grad u) + (u - p)^3 + p u`, where `p` is the value of `u` at the previous
/// commit.
#[derive(Debug, Copy, Clone)]
struct HistoryDependent;

impl<const D: usize> Integrand<D> for HistoryDependent {
    type State = Memory;

    fn evaluate<T: Numeric>(
        &self,
        _x: &SVector<f64, D>,
        fields: &[FieldValue<T, D>],
        state: &mut Memory,
    ) -> QuadratureResponse<T, D> {
        let u = fields[0].scalar();
        let p = state.previous;
        state.previous = u.value();
        let source = (u - p).powi(3) + u * p;
        QuadratureResponse::scalar(source, fields[0].scalar_gradient().map(|g| g * (1.0 + p * p)))
    }
}

/// `-div(a^2 grad u) + b u` with uniform parameters `(a, b)` as the second field.
#[derive(Debug, Copy, Clone)]
struct ParametrizedDiffusion;

impl<const D: usize> Integrand<D> for ParametrizedDiffusion {
    type State = ();

    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        let u = fields[0].scalar();
        let (a, b) = (fields[1].value[0], fields[1].value[1]);
        assert!(fields[1].gradient.iter().all(|g| g.value() == 0.0));
        QuadratureResponse::scalar(b * u, fields[0].scalar_gradient().map(|g| g * a * a))
    }
}

#[derive(Debug, Copy, Clone)]
struct UnitSource;

impl<const D: usize> Integrand<D> for UnitSource {
    type State = ();

    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, fields: &[FieldValue<T, D>], _state: &mut ()) -> QuadratureResponse<T, D> {
        assert!(fields.is_empty());
        QuadratureResponse::scalar(T::one(), SVector::zeros())
    }
}

#[derive(Debug, Copy, Clone)]
struct UnitLoad;

impl<const D: usize> BoundaryIntegrand<D> for UnitLoad {
    fn evaluate<T: Numeric>(&self, _x: &SVector<f64, D>, _normal: &SVector<f64, D>, _values: &[DVector<T>]) -> DVector<T> {
        DVector::from_element(1, T::one())
    }
}

/// `u^2 n_0 + u x_1`.
#[derive(Debug, Copy, Clone)]
struct Robin;

impl<const D: usize> BoundaryIntegrand<D> for Robin {
    fn evaluate<T: Numeric>(&self, x: &SVector<f64, D>, normal: &SVector<f64, D>, values: &[DVector<T>]) -> DVector<T> {
        let u = values[0][0];
        DVector::from_element(1, u * u * normal[0] + u * x[D - 1])
    }
}

fn random(len: usize, seed: u64, scale: f64) -> DVector<f64> {
    util::pseudo_random_vector(len, seed) * scale
}

/// Finite difference Jacobian of the residual with respect to trial field `field`.
fn residual_jacobian_fd<const D: usize>(functional: &Functional<D>, inputs: &[&[f64]], field: usize) -> DMatrix<f64> {
    let mut x = inputs[field].to_vec();
    let m = functional.test_space().num_dofs();
    approximate_jacobian_fd(
        m,
        |x, out| {
            let args: Vec<&[f64]> = inputs
                .iter()
                .enumerate()
                .map(|(k, &input)| if k == field { x } else { input })
                .collect();
            out.copy_from_slice(functional.residual(&args).unwrap().as_slice());
        },
        &mut x,
        1e-6,
    )
}

fn scalar_functional<const D: usize>(grid: &StructuredGrid<D>, points: usize) -> Functional<D> {
    let space = grid.space(1).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(Nonlinear, &grid.domain(points).unwrap(), None)
        .unwrap();
    functional
}

#[test]
fn unit_hexahedron_mass_and_stiffness() {
    let grid = StructuredGrid::<3>::unit(1, 1).unwrap();
    let domain = grid.domain(2).unwrap();
    let space = grid.space(1).unwrap();
    let coordinates = grid.node_coordinates();

    let mut mass = Functional::new(space.clone(), vec![space.clone()]);
    mass.add_domain_integral(Mass, &domain, None).unwrap();
    let ones = vec![1.0; 8];
    let r = mass.residual(&[&ones]).unwrap();
    for &r_i in r.iter() {
        assert_scalar_eq!(r_i, 0.125, comp = abs, tol = 1e-14);
    }

    // Each trilinear shape function has x-derivative integrating to +-1/4
    let mut stiffness = Functional::new(space.clone(), vec![space]);
    stiffness
        .add_domain_integral(Diffusion { conductivity: 1.0 }, &domain, None)
        .unwrap();
    let u = util::nodal_vector(&coordinates, 1, |x| dvector![x[0]]);
    let r = stiffness.residual(&[u.as_slice()]).unwrap();
    for (node, &r_i) in r.iter().enumerate() {
        let expected = if coordinates[node][0] > 0.5 { 0.25 } else { -0.25 };
        assert_scalar_eq!(r_i, expected, comp = abs, tol = 1e-14);
    }
}

#[test]
fn gradient_action_matches_finite_differences() {
    let grid = StructuredGrid::<2>::new(2, [2, 2], [1.0, 1.5]).unwrap();
    let functional = scalar_functional(&grid, 3);
    let n = grid.num_nodes();
    let u = random(n, 1, 0.5);
    let v = random(n, 2, 1.0);

    let (residual, gradient) = functional.gradient(&[u.as_slice()], 0).unwrap();
    assert_eq!(gradient.wrt(), 0);
    assert_eq!((gradient.nrows(), gradient.ncols()), (n, n));
    let expected_residual = functional.residual(&[u.as_slice()]).unwrap();
    assert_matrix_eq!(residual, expected_residual, comp = abs, tol = 1e-13);

    let h = 1e-6;
    let plus = functional.residual(&[(&u + &v * h).as_slice()]).unwrap();
    let minus = functional.residual(&[(&u - &v * h).as_slice()]).unwrap();
    let fd = (plus - minus) / (2.0 * h);
    let action = gradient.apply(v.as_slice()).unwrap();
    assert_matrix_eq!(action, fd, comp = abs, tol = 1e-7);
}

#[test]
fn assembled_gradient_matches_action_and_finite_differences() {
    let grid = StructuredGrid::<2>::new(2, [2, 2], [1.0, 1.5]).unwrap();
    let functional = scalar_functional(&grid, 3);
    let n = grid.num_nodes();
    let u = random(n, 3, 0.5);
    let v = random(n, 4, 1.0);

    let (_, gradient) = functional.gradient(&[u.as_slice()], 0).unwrap();
    let csr = gradient.assemble().unwrap();
    assert_eq!((csr.nrows(), csr.ncols()), (n, n));
    let dense = DMatrix::from(&csr);
    assert_matrix_eq!(&dense * &v, gradient.apply(v.as_slice()).unwrap(), comp = abs, tol = 1e-12);

    let fd = residual_jacobian_fd(&functional, &[u.as_slice()], 0);
    assert_matrix_eq!(dense, fd, comp = abs, tol = 1e-7);
}

#[test]
fn diffusion_gradient_is_symmetric() {
    let grid = StructuredGrid::<3>::new(2, [2, 1, 1], [1.0, 0.5, 0.5]).unwrap();
    let space = grid.space(1).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(Diffusion { conductivity: 2.0 }, &grid.domain(3).unwrap(), None)
        .unwrap();
    let u = vec![0.0; grid.num_nodes()];
    let (_, gradient) = functional.gradient(&[&u], 0).unwrap();
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    assert_matrix_eq!(dense, dense.transpose(), comp = abs, tol = 1e-13);

    // Constants are in the kernel of the stiffness operator
    let ones = DVector::from_element(grid.num_nodes(), 1.0);
    assert_matrix_eq!(&dense * ones, DVector::zeros(grid.num_nodes()), comp = abs, tol = 1e-12);
}

#[test]
fn evaluate_returns_gradient_for_marked_argument() {
    let grid = StructuredGrid::<2>::unit(2, 2).unwrap();
    let functional = scalar_functional(&grid, 3);
    let u = random(grid.num_nodes(), 5, 0.5);
    let v = random(grid.num_nodes(), 6, 1.0);

    let (residual, gradient) = functional.evaluate(&[Input::from(&u)]).unwrap();
    assert!(gradient.is_none());
    let (differentiated_residual, gradient) = functional
        .evaluate(&[differentiate_wrt(u.as_slice())])
        .unwrap();
    assert_matrix_eq!(residual, differentiated_residual, comp = abs, tol = 1e-13);
    let gradient = gradient.unwrap();
    assert_eq!(gradient.wrt(), 0);

    let (_, expected) = functional.gradient(&[u.as_slice()], 0).unwrap();
    assert_matrix_eq!(
        gradient.apply(v.as_slice()).unwrap(),
        expected.apply(v.as_slice()).unwrap(),
        comp = abs,
        tol = 1e-13
    );
}

#[test]
fn at_most_one_argument_can_be_differentiated() {
    let grid = StructuredGrid::<2>::unit(1, 2).unwrap();
    let scalar = grid.space(1).unwrap();
    let vector = grid.space(2).unwrap();
    let mut functional = Functional::new(scalar.clone(), vec![scalar, vector]);
    functional
        .add_domain_integral(Coupled, &grid.domain(2).unwrap(), None)
        .unwrap();
    let u = vec![0.1; grid.num_nodes()];
    let v = vec![0.2; 2 * grid.num_nodes()];

    let err = functional
        .evaluate(&[differentiate_wrt(&u), differentiate_wrt(&v)])
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::MultipleDifferentiationArguments)
    );

    let err = functional.gradient(&[&u, &v], 2).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigurationError>(),
        Some(ConfigurationError::InputCount { expected: 2, .. })
    ));
}

#[test]
fn gradient_with_respect_to_second_field() {
    let grid = StructuredGrid::<2>::new(2, [2, 1], [1.0, 0.5]).unwrap();
    let scalar = grid.space(1).unwrap();
    let vector = grid.space(2).unwrap();
    let mut functional = Functional::new(scalar.clone(), vec![scalar, vector]);
    functional
        .add_domain_integral(Coupled, &grid.domain(3).unwrap(), None)
        .unwrap();
    let n = grid.num_nodes();
    let u = random(n, 7, 0.5);
    let v = random(2 * n, 8, 0.5);
    let inputs = [u.as_slice(), v.as_slice()];

    let (_, gradient) = functional.gradient(&inputs, 1).unwrap();
    assert_eq!((gradient.nrows(), gradient.ncols()), (n, 2 * n));
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    let fd = residual_jacobian_fd(&functional, &inputs, 1);
    assert_matrix_eq!(dense, fd, comp = abs, tol = 1e-7);

    let direction = random(2 * n, 9, 1.0);
    let (_, marked) = functional
        .evaluate(&[Input::from(&u), differentiate_wrt(v.as_slice())])
        .unwrap();
    let marked = marked.unwrap();
    assert_eq!(marked.wrt(), 1);
    assert_matrix_eq!(
        marked.apply(direction.as_slice()).unwrap(),
        &dense * &direction,
        comp = abs,
        tol = 1e-12
    );

    let err = marked.apply(&direction.as_slice()[..n]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigurationError>(),
        Some(ConfigurationError::InputLength { field: 1, .. })
    ));
}

#[test]
fn quadrature_data_is_committed_only_when_requested() {
    let grid = StructuredGrid::<2>::new(1, [2, 3], [1.0, 1.0]).unwrap();
    let domain = grid.domain(2).unwrap();
    let space = grid.space(1).unwrap();
    let qdata = QuadratureData::new(domain.num_elements(), domain.points_per_element(), Counter::default());
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(CountingMass, &domain, Some(qdata.clone()))
        .unwrap();

    let u = util::nodal_vector(&grid.node_coordinates(), 1, |x| dvector![x[0] + 2.0 * x[1]]);
    let all_evaluated = |count: usize| qdata.read().iter().all(|s| s.evaluations == count);

    assert!(!functional.update_qdata);
    let first = functional.residual(&[u.as_slice()]).unwrap();
    assert!(all_evaluated(0));

    // Derivative passes never commit
    functional.update_qdata = true;
    let (_, gradient) = functional.gradient(&[u.as_slice()], 0).unwrap();
    gradient.apply(u.as_slice()).unwrap();
    gradient.assemble().unwrap();
    assert!(all_evaluated(0));

    let committed = functional.residual(&[u.as_slice()]).unwrap();
    assert_matrix_eq!(committed, first, comp = abs, tol = 1e-14);
    assert!(all_evaluated(1));
    for element in 0..domain.num_elements() {
        for point in 0..domain.points_per_element() {
            let x = domain.position(element, point);
            assert_scalar_eq!(qdata.get(element, point).last, x[0] + 2.0 * x[1], comp = abs, tol = 1e-13);
        }
    }

    // The stored state is read back by later passes
    functional.update_qdata = false;
    let second = functional.residual(&[u.as_slice()]).unwrap();
    assert_matrix_eq!(second, &first * 2.0, comp = abs, tol = 1e-13);
    assert!(all_evaluated(1));

    functional.update_qdata = true;
    let (third, gradient) = functional
        .evaluate(&[differentiate_wrt(u.as_slice())])
        .unwrap();
    assert_matrix_eq!(third, &first * 2.0, comp = abs, tol = 1e-13);
    assert!(all_evaluated(2));
    // The gradient is linearized at the states the residual saw, not the committed ones
    let gradient = gradient.unwrap();
    let action = gradient.apply(u.as_slice()).unwrap();
    assert_matrix_eq!(action, third, comp = abs, tol = 1e-13);
    assert!(all_evaluated(2));

    // Later commits do not move an existing gradient
    functional.residual(&[u.as_slice()]).unwrap();
    assert!(all_evaluated(3));
    let action = gradient.apply(u.as_slice()).unwrap();
    assert_matrix_eq!(action, third, comp = abs, tol = 1e-13);
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    assert_matrix_eq!(&dense * &u, third, comp = abs, tol = 1e-13);
}

#[test]
fn committing_evaluation_is_differentiated_at_the_previous_state() {
    let grid = StructuredGrid::<2>::new(2, [2, 2], [1.0, 1.5]).unwrap();
    let domain = grid.domain(3).unwrap();
    let space = grid.space(1).unwrap();
    let qdata = QuadratureData::new(domain.num_elements(), domain.points_per_element(), Memory::default());
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(HistoryDependent, &domain, Some(qdata.clone()))
        .unwrap();

    let n = grid.num_nodes();
    let u0 = random(n, 30, 0.5);
    let u1 = random(n, 31, 0.5);
    let v = random(n, 32, 1.0);

    functional.update_qdata = true;
    functional.residual(&[u0.as_slice()]).unwrap();
    let previous = qdata.read().to_vec();

    // Reference derivative with the states held fixed at the previous commit
    functional.update_qdata = false;
    let expected_residual = functional.residual(&[u1.as_slice()]).unwrap();
    let h = 1e-6;
    let plus = functional.residual(&[(&u1 + &v * h).as_slice()]).unwrap();
    let minus = functional.residual(&[(&u1 - &v * h).as_slice()]).unwrap();
    let fd = (plus - minus) / (2.0 * h);
    assert_eq!(*qdata.read(), previous);

    functional.update_qdata = true;
    let (residual, gradient) = functional
        .evaluate(&[differentiate_wrt(u1.as_slice())])
        .unwrap();
    assert_ne!(*qdata.read(), previous);
    assert_matrix_eq!(residual, expected_residual, comp = abs, tol = 1e-13);

    let gradient = gradient.unwrap();
    let action = gradient.apply(v.as_slice()).unwrap();
    assert_matrix_eq!(action, fd, comp = abs, tol = 1e-7);
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    assert_matrix_eq!(&dense * &v, action, comp = abs, tol = 1e-12);
}

#[test]
fn execution_policies_agree() {
    let grid = StructuredGrid::<3>::new(2, [2, 2, 2], [1.0, 0.8, 1.2]).unwrap();
    let sides = [Side::lower(0), Side::upper(2)];
    let space = grid.space_with_boundary(1, &sides).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(Nonlinear, &grid.domain(3).unwrap(), None)
        .unwrap();
    functional
        .add_boundary_integral(Robin, &grid.boundary_domain(&sides, 3).unwrap())
        .unwrap();
    assert_eq!(functional.num_integrals(), 2);

    let n = grid.num_nodes();
    let u = random(n, 10, 0.5);
    let v = random(n, 11, 1.0);
    let evaluate = |functional: &Functional<3>| {
        let residual = functional.residual(&[u.as_slice()]).unwrap();
        let (_, gradient) = functional.gradient(&[u.as_slice()], 0).unwrap();
        let action = gradient.apply(v.as_slice()).unwrap();
        let dense = DMatrix::from(&gradient.assemble().unwrap());
        (residual, action, dense)
    };

    functional.set_settings(AssemblySettings::default().with_execution(ExecutionPolicy::Serial));
    let (residual, action, dense) = evaluate(&functional);
    let policies = [
        ExecutionPolicy::Parallel,
        ExecutionPolicy::WorkGroup { block: BlockDim::new(3, 3, 3) },
        ExecutionPolicy::WorkGroup { block: BlockDim::new(2, 1, 4) },
    ];
    for policy in policies {
        functional.set_settings(AssemblySettings::default().with_execution(policy));
        assert_eq!(functional.settings().execution, policy);
        let (other_residual, other_action, other_dense) = evaluate(&functional);
        assert_matrix_eq!(other_residual, residual, comp = abs, tol = 1e-12);
        assert_matrix_eq!(other_action, action, comp = abs, tol = 1e-12);
        assert_matrix_eq!(other_dense, dense, comp = abs, tol = 1e-12);
    }
}

#[test]
fn boundary_integrals_measure_the_boundary() {
    let square = StructuredGrid::<2>::unit(1, 2).unwrap();
    let sides = square.sides();
    let space = square.space_with_boundary(1, &sides).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_boundary_integral(UnitLoad, &square.boundary_domain(&sides, 2).unwrap())
        .unwrap();
    let u = vec![0.0; square.num_nodes()];
    let r = functional.residual(&[&u]).unwrap();
    assert_scalar_eq!(r.sum(), 4.0, comp = abs, tol = 1e-13);
    // The center node does not touch the boundary
    assert_scalar_eq!(r[4], 0.0, comp = abs, tol = 1e-14);

    let cube = StructuredGrid::<3>::unit(2, 1).unwrap();
    let sides = cube.sides();
    let space = cube.space_with_boundary(1, &sides).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space])
        .with_settings(AssemblySettings::default().with_execution(ExecutionPolicy::WorkGroup {
            block: BlockDim::new(2, 2, 2),
        }));
    functional
        .add_boundary_integral(UnitLoad, &cube.boundary_domain(&sides, 3).unwrap())
        .unwrap();
    let u = vec![0.0; cube.num_nodes()];
    let r = functional.residual(&[&u]).unwrap();
    assert_scalar_eq!(r.sum(), 6.0, comp = abs, tol = 1e-13);
}

#[test]
fn boundary_gradient_matches_finite_differences() {
    let grid = StructuredGrid::<2>::new(2, [2, 1], [1.0, 0.5]).unwrap();
    let sides = grid.sides();
    let space = grid.space_with_boundary(1, &sides).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space]);
    functional
        .add_domain_integral(Diffusion { conductivity: 0.5 }, &grid.domain(3).unwrap(), None)
        .unwrap();
    functional
        .add_boundary_integral(Robin, &grid.boundary_domain(&sides, 3).unwrap())
        .unwrap();

    let u = random(grid.num_nodes(), 12, 0.5);
    let (_, gradient) = functional.gradient(&[u.as_slice()], 0).unwrap();
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    let fd = residual_jacobian_fd(&functional, &[u.as_slice()], 0);
    assert_matrix_eq!(dense, fd, comp = abs, tol = 1e-7);
}

#[test]
fn malformed_inputs_are_rejected() {
    let grid = StructuredGrid::<2>::unit(1, 2).unwrap();
    let functional = scalar_functional(&grid, 2);
    let err = functional.residual(&[]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::InputCount { expected: 1, actual: 0 })
    );

    let short = vec![0.0; grid.num_nodes() - 1];
    let err = functional.residual(&[&short]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::InputLength {
            field: 0,
            expected: grid.num_nodes(),
            actual: grid.num_nodes() - 1
        })
    );
    assert!(functional.gradient(&[&short], 0).is_err());
}

#[test]
fn work_group_execution_needs_hexahedra_and_threads() {
    let square = StructuredGrid::<2>::unit(1, 2).unwrap();
    let mut functional = scalar_functional(&square, 2);
    functional.set_settings(AssemblySettings::default().with_execution(ExecutionPolicy::WorkGroup {
        block: BlockDim::new(2, 2, 1),
    }));
    let u = vec![0.0; square.num_nodes()];
    let err = functional.residual(&[&u]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::UnsupportedExecution {
            geometry: Geometry::Quadrilateral
        })
    );

    let cube = StructuredGrid::<3>::unit(1, 1).unwrap();
    let mut functional = scalar_functional(&cube, 2);
    functional.set_settings(AssemblySettings::default().with_execution(ExecutionPolicy::WorkGroup {
        block: BlockDim::new(2, 0, 2),
    }));
    let u = vec![0.0; cube.num_nodes()];
    let err = functional.residual(&[&u]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::EmptyBlock)
    );
}

#[test]
fn inconsistent_integrals_are_rejected() {
    let grid = StructuredGrid::<2>::unit(1, 2).unwrap();
    let domain = grid.domain(2).unwrap();
    let space = grid.space(1).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space.clone()]);

    let qdata = QuadratureData::new(domain.num_elements() + 1, domain.points_per_element(), Counter::default());
    assert_eq!(
        functional.add_domain_integral(CountingMass, &domain, Some(qdata)),
        Err(ConfigurationError::QuadratureDataMismatch {
            expected: (4, 4),
            actual: (5, 4)
        })
    );

    // A quadratic space on the nodes of a bilinear mesh
    let quadratic = FunctionSpace::new(2, 1, grid.num_nodes(), grid.restriction().unwrap()).unwrap();
    let mut functional = Functional::new(quadratic.clone(), vec![quadratic]);
    assert_eq!(
        functional.add_domain_integral(Mass, &domain, None),
        Err(ConfigurationError::NodeCountMismatch { expected: 9, actual: 4 })
    );

    let coarse = StructuredGrid::<2>::unit(1, 1).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space.clone()]);
    assert_eq!(
        functional.add_domain_integral(Mass, &coarse.domain(2).unwrap(), None),
        Err(ConfigurationError::ElementCountMismatch { expected: 1, actual: 4 })
    );
    assert_eq!(functional.num_integrals(), 0);
}

#[test]
fn boundary_integrals_need_boundary_restrictions() {
    let grid = StructuredGrid::<2>::unit(1, 2).unwrap();
    let sides = [Side::lower(1)];
    let with_boundary = grid.space_with_boundary(1, &sides).unwrap();
    let without_boundary = grid.space(1).unwrap();
    let boundary = grid.boundary_domain(&sides, 2).unwrap();

    let mut functional = Functional::new(with_boundary.clone(), vec![with_boundary.clone(), without_boundary.clone()]);
    assert_eq!(
        functional.add_boundary_integral(UnitLoad, &boundary),
        Err(ConfigurationError::MissingBoundaryRestriction { field: 1 })
    );

    let mut functional = Functional::new(without_boundary, vec![with_boundary]);
    assert_eq!(
        functional.add_boundary_integral(UnitLoad, &boundary),
        Err(ConfigurationError::MissingBoundaryRestriction { field: 1 })
    );
}

#[test]
fn uniform_parameters_are_differentiable() {
    let grid = StructuredGrid::<2>::new(2, [2, 2], [1.0, 1.5]).unwrap();
    let domain = grid.domain(3).unwrap();
    let space = grid.space(1).unwrap();
    let parameters = FunctionSpace::uniform(2).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space.clone(), parameters]);
    functional
        .add_domain_integral(ParametrizedDiffusion, &domain, None)
        .unwrap();

    let n = grid.num_nodes();
    let u = random(n, 20, 0.5);
    let k = dvector![1.5, -0.7];
    let inputs = [u.as_slice(), k.as_slice()];

    let mut diffusion = Functional::new(space.clone(), vec![space.clone()]);
    diffusion
        .add_domain_integral(Diffusion { conductivity: 2.25 }, &domain, None)
        .unwrap();
    let mut mass = Functional::new(space.clone(), vec![space]);
    mass.add_domain_integral(Mass, &domain, None).unwrap();
    let expected = diffusion.residual(&[u.as_slice()]).unwrap() - mass.residual(&[(&u * 0.7).as_slice()]).unwrap();
    assert_matrix_eq!(functional.residual(&inputs).unwrap(), expected, comp = abs, tol = 1e-12);

    let (_, gradient) = functional.gradient(&inputs, 1).unwrap();
    assert_eq!((gradient.nrows(), gradient.ncols()), (n, 2));
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    let fd = residual_jacobian_fd(&functional, &inputs, 1);
    assert_matrix_eq!(dense, fd, comp = abs, tol = 1e-7);

    let direction = dvector![0.3, 1.1];
    let (_, marked) = functional
        .evaluate(&[Input::from(&u), differentiate_wrt(k.as_slice())])
        .unwrap();
    assert_matrix_eq!(
        marked.unwrap().apply(direction.as_slice()).unwrap(),
        &dense * &direction,
        comp = abs,
        tol = 1e-12
    );

    // The derivative with respect to the nodal field sees the parameters as constants
    let (_, gradient) = functional.gradient(&inputs, 0).unwrap();
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    let fd = residual_jacobian_fd(&functional, &inputs, 0);
    assert_matrix_eq!(dense, fd, comp = abs, tol = 1e-7);
}

#[test]
fn uniform_parameters_agree_across_execution_policies() {
    let grid = StructuredGrid::<3>::new(2, [2, 1, 2], [1.0, 0.5, 1.0]).unwrap();
    let space = grid.space(1).unwrap();
    let parameters = FunctionSpace::uniform(2).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space, parameters]);
    functional
        .add_domain_integral(ParametrizedDiffusion, &grid.domain(3).unwrap(), None)
        .unwrap();
    let u = random(grid.num_nodes(), 21, 0.5);
    let k = dvector![0.8, 2.0];
    let inputs = [u.as_slice(), k.as_slice()];
    let evaluate = |functional: &Functional<3>| {
        let residual = functional.residual(&inputs).unwrap();
        let (_, gradient) = functional.gradient(&inputs, 1).unwrap();
        (residual, DMatrix::from(&gradient.assemble().unwrap()))
    };

    functional.set_settings(AssemblySettings::default().with_execution(ExecutionPolicy::Serial));
    let (residual, dense) = evaluate(&functional);
    functional.set_settings(AssemblySettings::default().with_execution(ExecutionPolicy::WorkGroup {
        block: BlockDim::new(3, 3, 3),
    }));
    let (other_residual, other_dense) = evaluate(&functional);
    assert_matrix_eq!(other_residual, residual, comp = abs, tol = 1e-12);
    assert_matrix_eq!(other_dense, dense, comp = abs, tol = 1e-12);
}

#[test]
fn uniform_test_space_integrates_over_the_domain() {
    let grid = StructuredGrid::<2>::new(2, [2, 3], [1.0, 1.5]).unwrap();
    let domain = grid.domain(3).unwrap();
    let space = grid.space(1).unwrap();
    let total = FunctionSpace::uniform(1).unwrap();

    let mut area = Functional::new(total.clone(), vec![space.clone()]);
    area.add_dependent_domain_integral(&[], UnitSource, &domain, None)
        .unwrap();
    let u = vec![0.0; grid.num_nodes()];
    let r = area.residual(&[&u]).unwrap();
    assert_eq!(r.len(), 1);
    assert_scalar_eq!(r[0], 1.5, comp = abs, tol = 1e-13);

    // The integral of x + 2y over [0, 1] x [0, 1.5]
    let mut integral = Functional::new(total, vec![space.clone()]);
    integral.add_domain_integral(Mass, &domain, None).unwrap();
    let u = util::nodal_vector(&grid.node_coordinates(), 1, |x| dvector![x[0] + 2.0 * x[1]]);
    let r = integral.residual(&[u.as_slice()]).unwrap();
    assert_scalar_eq!(r[0], 3.0, comp = abs, tol = 1e-12);

    // Its gradient is the row of basis function integrals
    let (_, gradient) = integral.gradient(&[u.as_slice()], 0).unwrap();
    assert_eq!((gradient.nrows(), gradient.ncols()), (1, grid.num_nodes()));
    let dense = DMatrix::from(&gradient.assemble().unwrap());
    let mut mass = Functional::new(space.clone(), vec![space]);
    mass.add_domain_integral(Mass, &domain, None).unwrap();
    let ones = vec![1.0; grid.num_nodes()];
    let basis_integrals = mass.residual(&[&ones]).unwrap();
    let row = DVector::from_iterator(grid.num_nodes(), dense.iter().copied());
    assert_matrix_eq!(row, basis_integrals, comp = abs, tol = 1e-13);
}

#[test]
fn uniform_test_space_measures_the_boundary() {
    let square = StructuredGrid::<2>::unit(1, 2).unwrap();
    let sides = square.sides();
    let boundary = square.boundary_domain(&sides, 2).unwrap();
    let total = FunctionSpace::uniform(1).unwrap();

    // Neither the uniform test space nor an unused nodal field needs a boundary restriction
    let mut perimeter = Functional::new(total.clone(), vec![square.space(1).unwrap()]);
    assert_eq!(
        perimeter.add_boundary_integral(UnitLoad, &boundary),
        Err(ConfigurationError::MissingBoundaryRestriction { field: 0 })
    );
    perimeter
        .add_dependent_boundary_integral(&[], UnitLoad, &boundary)
        .unwrap();
    let u = vec![0.0; square.num_nodes()];
    let r = perimeter.residual(&[&u]).unwrap();
    assert_scalar_eq!(r[0], 4.0, comp = abs, tol = 1e-13);
}

#[test]
fn integrals_see_only_their_dependencies() {
    let grid = StructuredGrid::<2>::new(2, [2, 1], [1.0, 0.5]).unwrap();
    let domain = grid.domain(3).unwrap();
    let scalar = grid.space(1).unwrap();
    let vector = grid.space(2).unwrap();
    let n = grid.num_nodes();
    let u = random(n, 22, 0.5);
    let v = random(2 * n, 23, 0.5);

    let mut reference = Functional::new(scalar.clone(), vec![scalar.clone(), vector.clone()]);
    reference.add_domain_integral(Coupled, &domain, None).unwrap();

    // Fields are handed over in the order of the dependency list
    let mut reordered = Functional::new(scalar.clone(), vec![vector, scalar.clone()]);
    reordered
        .add_dependent_domain_integral(&[1, 0], Coupled, &domain, None)
        .unwrap();
    assert_matrix_eq!(
        reordered.residual(&[v.as_slice(), u.as_slice()]).unwrap(),
        reference.residual(&[u.as_slice(), v.as_slice()]).unwrap(),
        comp = abs,
        tol = 1e-13
    );
    let (_, gradient) = reordered
        .gradient(&[v.as_slice(), u.as_slice()], 0)
        .unwrap();
    let (_, expected) = reference.gradient(&[u.as_slice(), v.as_slice()], 1).unwrap();
    assert_matrix_eq!(
        DMatrix::from(&gradient.assemble().unwrap()),
        DMatrix::from(&expected.assemble().unwrap()),
        comp = abs,
        tol = 1e-13
    );

    // The derivative with respect to a field nothing depends on vanishes
    let mut partial = Functional::new(scalar.clone(), vec![scalar.clone(), scalar]);
    partial
        .add_dependent_domain_integral(&[0], Nonlinear, &domain, None)
        .unwrap();
    let w = random(n, 24, 0.5);
    let (_, gradient) = partial.gradient(&[u.as_slice(), w.as_slice()], 1).unwrap();
    assert_eq!((gradient.nrows(), gradient.ncols()), (n, n));
    assert_eq!(gradient.assemble().unwrap().nnz(), 0);
    assert_matrix_eq!(
        gradient.apply(w.as_slice()).unwrap(),
        DVector::zeros(n),
        comp = abs,
        tol = 0.0
    );
}

#[test]
fn invalid_dependencies_are_rejected() {
    let grid = StructuredGrid::<2>::unit(1, 2).unwrap();
    let domain = grid.domain(2).unwrap();
    let sides = grid.sides();
    let boundary = grid.boundary_domain(&sides, 2).unwrap();
    let space = grid.space_with_boundary(1, &sides).unwrap();
    let mut functional = Functional::new(space.clone(), vec![space.clone(), space]);

    assert_eq!(
        functional.add_dependent_domain_integral(&[2], Mass, &domain, None),
        Err(ConfigurationError::InvalidDependency { field: 2 })
    );
    assert_eq!(
        functional.add_dependent_domain_integral(&[1, 0, 1], Mass, &domain, None),
        Err(ConfigurationError::InvalidDependency { field: 1 })
    );
    assert_eq!(
        functional.add_dependent_boundary_integral(&[0, 0], Robin, &boundary),
        Err(ConfigurationError::InvalidDependency { field: 0 })
    );
    assert_eq!(functional.num_integrals(), 0);
}
