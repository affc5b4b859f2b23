use crate::{constant_jacobians, h1_element};
use matrixcompare::assert_scalar_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use tessera::element::{Element, FiniteElement};
use tessera::integrate::pull_back;
use tessera::interpolate::{QuadratureFields, SumFactorizationCache};
use tessera::quadrature::Geometry;

/// Row-major affine Jacobians with positive determinant.
fn jacobian(dim: usize) -> Vec<f64> {
    match dim {
        1 => vec![0.7],
        2 => vec![1.3, 0.2, -0.4, 0.9],
        _ => vec![1.1, 0.2, 0.0, -0.1, 0.8, 0.3, 0.2, 0.0, 1.4],
    }
}

fn determinant(j: &[f64]) -> f64 {
    match j.len() {
        1 => j[0],
        4 => j[0] * j[3] - j[1] * j[2],
        _ => {
            j[0] * (j[4] * j[8] - j[5] * j[7]) - j[1] * (j[3] * j[8] - j[5] * j[6])
                + j[2] * (j[3] * j[7] - j[4] * j[6])
        }
    }
}

/// Checks `<integrate(s, f), u> = sum_q w_q det(J) (s . u + f : grad u)` where `u` and its
/// physical gradient come from interpolating the same dofs.
fn check_adjoint(element: &Element, components: usize, seed: &[f64]) -> Result<(), TestCaseError> {
    let dim = element.dimension();
    let nq = element.quadrature().len();
    let ndofs = components * element.num_nodes();
    let jacobian = jacobian(dim);
    let jacobians = constant_jacobians(&jacobian, nq);
    let mut cache = SumFactorizationCache::default();

    let generate = |len: usize, offset: usize| -> Vec<f64> {
        (0..len)
            .map(|k| seed[(k + offset) % seed.len()] * (1.0 + 0.1 * k as f64).cos())
            .collect()
    };
    let u = generate(ndofs, 0);
    let mut fields = QuadratureFields::new(nq, components, dim);
    fields.values_mut().copy_from_slice(&generate(nq * components, 1));
    fields
        .gradients_mut()
        .copy_from_slice(&generate(nq * components * dim, 2));

    let mut interpolated = QuadratureFields::new(nq, components, dim);
    element.interpolate(&u, &jacobians, &mut interpolated, &mut cache);
    let det = determinant(&jacobian);
    let mut expected = 0.0;
    for (point, &w) in element.quadrature().weights().iter().enumerate() {
        let s_dot_u: f64 = dot(fields.point_values(point), interpolated.point_values(point));
        let f_dot_grad_u: f64 = dot(fields.point_gradients(point), interpolated.point_gradients(point));
        expected += w * det * (s_dot_u + f_dot_grad_u);
    }

    let mut residual = vec![0.0; ndofs];
    element.integrate(&mut fields, &jacobians, &mut residual, &mut cache);
    let actual: f64 = dot(&residual, &u);

    let scale = 1.0 + expected.abs();
    prop_assert!(
        (actual - expected).abs() <= 1e-11 * scale,
        "{:?}: <integrate(s, f), u> = {}, quadrature sum = {}",
        element.geometry(),
        actual,
        expected
    );
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

proptest! {
    #[test]
    fn segment_integration_is_adjoint_of_interpolation(seed in vec(-1.0..1.0f64, 5..12), order in 1usize..5) {
        check_adjoint(&h1_element(Geometry::Segment, order, order + 1), 2, &seed)?;
    }

    #[test]
    fn quadrilateral_integration_is_adjoint_of_interpolation(seed in vec(-1.0..1.0f64, 5..12), order in 1usize..4) {
        check_adjoint(&h1_element(Geometry::Quadrilateral, order, order + 1), 2, &seed)?;
    }

    #[test]
    fn hexahedron_integration_is_adjoint_of_interpolation(seed in vec(-1.0..1.0f64, 5..12), order in 1usize..3) {
        check_adjoint(&h1_element(Geometry::Hexahedron, order, order + 1), 3, &seed)?;
    }

    #[test]
    fn triangle_integration_is_adjoint_of_interpolation(seed in vec(-1.0..1.0f64, 5..12), order in 1usize..3) {
        check_adjoint(&h1_element(Geometry::Triangle, order, 3), 1, &seed)?;
    }

    #[test]
    fn tetrahedron_integration_is_adjoint_of_interpolation(seed in vec(-1.0..1.0f64, 5..12), order in 1usize..3) {
        check_adjoint(&h1_element(Geometry::Tetrahedron, order, 4), 2, &seed)?;
    }
}

#[test]
fn pull_back_scales_sources_by_volume_element() {
    let mut fields = QuadratureFields::new(2, 1, 2);
    fields.values_mut().copy_from_slice(&[1.0, 2.0]);
    fields.gradients_mut().copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
    // J = diag(2, 3), det 6, J^{-T} = diag(1/2, 1/3)
    let jacobians = [2.0, 0.0, 0.0, 3.0, 2.0, 0.0, 0.0, 3.0];
    pull_back(&mut fields, &jacobians, &[0.5, 0.25]);
    let expected_gradients = [1.5, 0.0, 0.0, 0.5];
    for (&actual, expected) in fields.values().iter().zip([3.0, 3.0]) {
        assert_scalar_eq!(actual, expected, comp = abs, tol = 1e-14);
    }
    for (&actual, &expected) in fields.gradients().iter().zip(&expected_gradients) {
        assert_scalar_eq!(actual, expected, comp = abs, tol = 1e-14);
    }
}
