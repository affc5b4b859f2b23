use super::{displacement_gradient_2d, displacement_gradient_3d, lame_parameters};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use tessera::calculus::approximate_jacobian_fd;
use tessera::dual::make_dual_matrix;
use tessera::functional::{FieldGradient, FieldValue, Integrand};
use tessera::nalgebra::{vector, DMatrix, DVector, Matrix2, Matrix3, SMatrix, Vector2};
use tessera_materials::solid::{
    LameParameters, LinearIsotropicElasticity, NeoHookean, SolidMaterial, SolidMechanics, YoungPoisson,
};
use tessera_materials::MaterialError;

#[test]
fn lame_from_young_poisson() {
    let young_poisson = YoungPoisson {
        young: 1e3,
        poisson: 0.3,
    };
    let lame = LameParameters::from(young_poisson);

    assert_scalar_eq!(lame.mu, 384.6153846153846, comp = float);
    assert_scalar_eq!(lame.lambda, 576.9230769230769, comp = float);
}

#[test]
fn invalid_moduli_are_rejected() {
    let negative_shear = LameParameters { mu: -1.0, lambda: 1.0 };
    assert_eq!(
        NeoHookean::new(1.0, negative_shear),
        Err(MaterialError::NonPositiveShearModulus(-1.0))
    );

    let negative_bulk = LameParameters { mu: 3.0, lambda: -4.0 };
    assert_eq!(
        LinearIsotropicElasticity::new(1.0, negative_bulk),
        Err(MaterialError::NonPositiveBulkModulus(-2.0))
    );

    assert_eq!(
        LinearIsotropicElasticity::new(-1.0, lame_parameters()),
        Err(MaterialError::NegativeDensity(-1.0))
    );
}

#[test]
fn linear_elastic_stress_2d() {
    let material = LinearIsotropicElasticity::new(1.0, lame_parameters()).unwrap();
    let h = displacement_gradient_2d();
    let sigma = SolidMaterial::<2>::stress(&material, &mut (), &h);

    // eps = [0.2, -0.1; -0.1, 0.4], tr(eps) = 0.6
    let expected = Matrix2::new(
        2.0 * 384.0 * 0.2 + 577.0 * 0.6,
        2.0 * 384.0 * -0.1,
        2.0 * 384.0 * -0.1,
        2.0 * 384.0 * 0.4 + 577.0 * 0.6,
    );
    assert_matrix_eq!(sigma, expected, comp = abs, tol = 1e-10);
}

#[test]
fn neo_hookean_is_stress_free_in_reference_configuration() {
    let material = NeoHookean::new(1.0, lame_parameters()).unwrap();
    let sigma = SolidMaterial::<3>::stress(&material, &mut (), &Matrix3::zeros());
    assert_matrix_eq!(sigma, Matrix3::zeros(), comp = abs, tol = 1e-14);
}

#[test]
fn neo_hookean_linearizes_to_linear_elasticity() {
    let neo_hookean = NeoHookean::new(1.0, lame_parameters()).unwrap();
    let linear = LinearIsotropicElasticity::new(1.0, lame_parameters()).unwrap();
    let h = displacement_gradient_3d() * 1e-6;

    let tau = SolidMaterial::<3>::stress(&neo_hookean, &mut (), &h);
    let sigma = SolidMaterial::<3>::stress(&linear, &mut (), &h);
    // The difference is quadratic in the displacement gradient
    assert_matrix_eq!(tau, sigma, comp = abs, tol = 1e-6);
}

fn flatten(m: &Matrix3<f64>) -> DVector<f64> {
    DVector::from_column_slice(m.as_slice())
}

#[test]
fn neo_hookean_dual_tangent_matches_finite_differences() {
    let material = NeoHookean::new(1.0, lame_parameters()).unwrap();
    let h = displacement_gradient_3d();

    let tau = SolidMaterial::<3>::stress(&material, &mut (), &make_dual_matrix::<3, 3, 9>(&h));
    let tangent = DMatrix::from_fn(9, 9, |a, b| tau[a].gradient[b]);

    let mut x = flatten(&h);
    let tangent_fd = approximate_jacobian_fd(
        9,
        |x, out| {
            let h = SMatrix::<f64, 3, 3>::from_column_slice(x);
            let tau = SolidMaterial::<3>::stress(&material, &mut (), &h);
            out.copy_from_slice(tau.as_slice());
        },
        x.as_mut_slice(),
        1e-6,
    );
    assert_matrix_eq!(tangent, tangent_fd, comp = abs, tol = 1e-4);
}

#[test]
fn solid_mechanics_applies_body_force_and_inertia() {
    let material = LinearIsotropicElasticity::new(2.0, lame_parameters()).unwrap();
    let integrand = SolidMechanics::new(material).with_body_force(vector![0.0, -9.81]);
    let x = Vector2::zeros();
    let displacement = FieldValue::new(DVector::zeros(2), FieldGradient::zeros(2));
    let acceleration = FieldValue::new(DVector::from_column_slice(&[1.0, 0.5]), FieldGradient::zeros(2));

    let response = integrand.evaluate(&x, &[displacement.clone()], &mut ());
    assert_matrix_eq!(response.source, DVector::from_column_slice(&[0.0, 9.81]), comp = float);
    assert_matrix_eq!(response.flux, FieldGradient::<f64, 2>::zeros(2), comp = float);

    let response = integrand.evaluate(&x, &[displacement, acceleration], &mut ());
    assert_matrix_eq!(response.source, DVector::from_column_slice(&[2.0, 1.0 + 9.81]), comp = float);
}

#[test]
fn geometric_nonlinearity_pulls_back_kirchhoff_stress() {
    let material = NeoHookean::new(1.0, lame_parameters()).unwrap();
    let h = displacement_gradient_2d();
    let x = Vector2::zeros();
    let displacement = FieldValue::new(DVector::zeros(2), FieldGradient::from_fn(2, |i, j| h[(i, j)]));

    let nonlinear = SolidMechanics::new(material);
    let small_strain = SolidMechanics::new(material).with_geometric_nonlinearity(false);
    let p = nonlinear.evaluate(&x, &[displacement.clone()], &mut ()).flux;
    let tau = small_strain.evaluate(&x, &[displacement], &mut ()).flux;

    let f = h + Matrix2::identity();
    let f_inv_t = f.try_inverse().unwrap().transpose();
    let tau = Matrix2::from_fn(|i, j| tau[(i, j)]);
    let expected = FieldGradient::<f64, 2>::from_fn(2, |i, j| (tau * f_inv_t)[(i, j)]);
    assert_matrix_eq!(p, expected, comp = abs, tol = 1e-10);
}
