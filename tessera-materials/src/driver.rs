//! Point-wise material testing.
use crate::error::MaterialError;
use crate::solid::SolidMaterial;
use log::{trace, warn};
use tessera::dual::{get_value, make_dual_matrix};
use tessera::nalgebra::{Matrix2, Matrix3, Vector2};

/// Drives a single material point through a prescribed deformation history.
#[derive(Debug)]
pub struct MaterialDriver<'a, M: SolidMaterial<3>> {
    material: &'a M,
    tolerance: f64,
    max_iterations: usize,
}

impl<'a, M: SolidMaterial<3>> MaterialDriver<'a, M> {
    pub fn new(material: &'a M) -> Self {
        Self {
            material,
            tolerance: 1e-10,
            max_iterations: 10,
        }
    }

    /// Relative reduction of the lateral stress at which the Newton iteration stops.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs a uniaxial tension test.
    ///
    /// The axial displacement gradient follows `strain(t)` over `steps` equal time steps up to
    /// `max_time`. In every step the lateral components `du_y/dy` and `du_z/dz` are solved for
    /// such that the lateral stresses vanish, using the tangent obtained by evaluating the
    /// material with dual numbers. Material states are committed after each converged step.
    ///
    /// Returns the history of `(axial strain, axial stress)` pairs.
    pub fn run_uniaxial(
        &self,
        max_time: f64,
        strain: impl Fn(f64) -> f64,
        steps: usize,
    ) -> Result<Vec<(f64, f64)>, MaterialError> {
        let dt = max_time / steps as f64;
        let mut state = M::State::default();
        let mut du_dx = Matrix3::<f64>::zeros();
        let mut history = Vec::with_capacity(steps);

        for step in 1..=steps {
            du_dx[(0, 0)] = strain(dt * step as f64);

            let mut trial = state.clone();
            let mut stress = self
                .material
                .stress(&mut trial, &make_dual_matrix::<3, 3, 9>(&du_dx));
            let lateral = |stress: &Matrix3<f64>| Vector2::new(stress[(1, 1)], stress[(2, 2)]);
            let initial_norm = lateral(&get_value(&stress)).norm();

            let mut converged = initial_norm == 0.0;
            for iteration in 0..self.max_iterations {
                if converged {
                    break;
                }
                let r = lateral(&get_value(&stress));
                // Seeds are column-major, so du_ii is seeded in direction 4 * i
                let jacobian = Matrix2::new(
                    stress[(1, 1)].gradient[4],
                    stress[(1, 1)].gradient[8],
                    stress[(2, 2)].gradient[4],
                    stress[(2, 2)].gradient[8],
                );
                let correction = jacobian
                    .try_inverse()
                    .ok_or(MaterialError::SingularTangent { step })?
                    * r;
                du_dx[(1, 1)] -= correction[0];
                du_dx[(2, 2)] -= correction[1];

                trial = state.clone();
                stress = self
                    .material
                    .stress(&mut trial, &make_dual_matrix::<3, 3, 9>(&du_dx));
                let norm = lateral(&get_value(&stress)).norm();
                trace!("step {} iteration {}: lateral stress {:e}", step, iteration, norm);
                converged = norm < self.tolerance * initial_norm;
            }
            if !converged {
                warn!(
                    "uniaxial step {} did not converge in {} iterations",
                    step, self.max_iterations
                );
            }

            state = trial;
            history.push((du_dx[(0, 0)], stress[(0, 0)].value));
        }
        Ok(history)
    }
}
