use std::fmt;
use std::fmt::{Display, Formatter};

/// Invalid material parameters, or a material that cannot be driven further.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MaterialError {
    NegativeDensity(f64),
    NegativeSpecificHeat(f64),
    NegativeConductivity(f64),
    /// The conductivity tensor is not symmetric positive definite.
    IndefiniteConductivity,
    NonPositiveShearModulus(f64),
    NonPositiveBulkModulus(f64),
    /// The lateral tangent of a uniaxial test became singular.
    SingularTangent { step: usize },
}

impl Display for MaterialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDensity(value) => write!(f, "density must be non-negative, got {}", value),
            Self::NegativeSpecificHeat(value) => {
                write!(f, "specific heat capacity must be non-negative, got {}", value)
            }
            Self::NegativeConductivity(value) => write!(f, "conductivity must be non-negative, got {}", value),
            Self::IndefiniteConductivity => write!(f, "conductivity tensor must be symmetric positive definite"),
            Self::NonPositiveShearModulus(value) => write!(f, "shear modulus must be positive, got {}", value),
            Self::NonPositiveBulkModulus(value) => write!(f, "bulk modulus must be positive, got {}", value),
            Self::SingularTangent { step } => write!(f, "singular lateral tangent in step {}", step),
        }
    }
}

impl std::error::Error for MaterialError {}

pub(crate) fn check_density(density: f64) -> Result<(), MaterialError> {
    if density >= 0.0 {
        Ok(())
    } else {
        Err(MaterialError::NegativeDensity(density))
    }
}
