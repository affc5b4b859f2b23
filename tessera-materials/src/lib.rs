//! Heat transfer and solid mechanics integrands for `tessera`.
//!
//! Materials are written generically over [`Numeric`](tessera::Numeric), so that the same code
//! provides residuals in `f64` and exact tangents when evaluated with dual numbers.
pub mod driver;
pub mod error;
pub mod heat_transfer;
pub mod solid;

pub use driver::MaterialDriver;
pub use error::MaterialError;
