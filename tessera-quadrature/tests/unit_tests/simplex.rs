use matrixcompare::assert_scalar_eq;
use tessera_quadrature::integrate;
use tessera_quadrature::simplex::{tetrahedron, triangle, TETRAHEDRON_STRENGTHS, TRIANGLE_STRENGTHS};

fn factorial(n: i32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Exact integral of x^a y^b over the unit triangle.
fn triangle_monomial_integral(a: i32, b: i32) -> f64 {
    factorial(a) * factorial(b) / factorial(a + b + 2)
}

/// Exact integral of x^a y^b z^c over the unit tetrahedron.
fn tetrahedron_monomial_integral(a: i32, b: i32, c: i32) -> f64 {
    factorial(a) * factorial(b) * factorial(c) / factorial(a + b + c + 3)
}

#[test]
fn triangle_rules_have_restored_weights() {
    for index in 1..=5 {
        let (weights, points) = triangle(index).unwrap();
        assert!(!weights.is_empty());
        assert_eq!(weights.len(), points.len());
        assert!(weights.iter().all(|&w| w > 0.0));
        assert_scalar_eq!(weights.iter().sum::<f64>(), 0.5, comp = abs, tol = 1e-15);
        assert!(points
            .iter()
            .all(|&[x, y]| x > 0.0 && y > 0.0 && x + y < 1.0));
    }
    assert!(triangle(0).is_none());
    assert!(triangle(6).is_none());
}

#[test]
fn triangle_rules_satisfy_expected_accuracy() {
    for (i, &strength) in TRIANGLE_STRENGTHS.iter().enumerate() {
        let rule = triangle(i + 1).unwrap();
        let strength = strength as i32;
        for a in 0..=strength {
            for b in 0..=(strength - a) {
                let estimated = integrate(&rule, |&[x, y]| x.powi(a) * y.powi(b));
                let expected = triangle_monomial_integral(a, b);
                assert_scalar_eq!(estimated / expected, 1.0, comp = abs, tol = 1e-13);
            }
        }
    }
}

#[test]
fn tetrahedron_rules_have_restored_weights() {
    for index in 1..=6 {
        let (weights, points) = tetrahedron(index).unwrap();
        assert!(!weights.is_empty());
        assert_eq!(weights.len(), points.len());
        assert!(weights.iter().all(|&w| w > 0.0));
        assert_scalar_eq!(weights.iter().sum::<f64>(), 1.0 / 6.0, comp = abs, tol = 1e-15);
    }
    assert!(tetrahedron(0).is_none());
    assert!(tetrahedron(7).is_none());
}

#[test]
fn tetrahedron_rules_satisfy_expected_accuracy() {
    for (i, &strength) in TETRAHEDRON_STRENGTHS.iter().enumerate() {
        let rule = tetrahedron(i + 1).unwrap();
        let strength = strength as i32;
        for a in 0..=strength {
            for b in 0..=(strength - a) {
                for c in 0..=(strength - a - b) {
                    let estimated = integrate(&rule, |&[x, y, z]| x.powi(a) * y.powi(b) * z.powi(c));
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated / expected, 1.0, comp = abs, tol = 1e-13);
                }
            }
        }
    }
}
