//! Sum-factorized finite element kernels with forward-mode automatic differentiation.
//!
//! The crate evaluates weak-form residuals `r_i = integral(phi_i, u)` over meshes of tensor-product
//! and simplex cells. Field values and gradients are interpolated to quadrature points with
//! sum-factorized kernels, passed to user-defined [`Integrand`](functional::Integrand)s, and
//! integrated back against the test basis. Derivatives of residuals are computed exactly by
//! evaluating the same integrands with [`Dual`](dual::Dual) numbers.
pub mod basis;
pub mod calculus;
pub mod domain;
pub mod dual;
pub mod element;
pub mod error;
pub mod functional;
pub mod integrate;
pub mod interpolate;
pub mod procedural;
pub mod quadrature_data;
pub mod settings;
pub mod space;
pub mod tensor;
pub mod workgroup;

pub mod quadrature {
    pub use tessera_quadrature::*;
}

pub use error::ConfigurationError;
pub use tessera_traits::Numeric;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
