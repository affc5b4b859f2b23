//! Error types for misconfigured assembly.
use crate::element::Family;
use crate::quadrature::Geometry;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Errors caused by inconsistent or unsupported configuration.
///
/// These are fatal: they are reported when the offending object is constructed or when an
/// assembly pass is started, and no recovery is attempted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The requested quadrature rule does not exist.
    Quadrature(tessera_quadrature::Error),
    /// No element is available for the given combination.
    UnsupportedElement { geometry: Geometry, family: Family, order: usize },
    /// Nodal bases need at least two nodes per axis.
    UnsupportedOrder { order: usize },
    /// A runtime dimension does not agree with the dimension of the functional.
    DimensionMismatch { expected: usize, actual: usize },
    /// The number of nodes per element does not agree between two collaborators.
    NodeCountMismatch { expected: usize, actual: usize },
    /// The number of elements does not agree between two collaborators.
    ElementCountMismatch { expected: usize, actual: usize },
    /// A restriction refers to nodes that do not exist or is otherwise malformed.
    InvalidRestriction { reason: String },
    /// Wrong number of input fields passed to an evaluation.
    InputCount { expected: usize, actual: usize },
    /// An input vector has the wrong length.
    InputLength { field: usize, expected: usize, actual: usize },
    /// More than one input was marked for differentiation.
    MultipleDifferentiationArguments,
    /// Quadrature data does not cover the domain it is attached to.
    QuadratureDataMismatch { expected: (usize, usize), actual: (usize, usize) },
    /// The geometric Jacobian is singular or inverted.
    NonPositiveJacobian { element: usize, point: usize, determinant: f64 },
    /// The execution policy cannot process the given geometry.
    UnsupportedExecution { geometry: Geometry },
    /// A boundary integral requires a field without boundary restriction.
    MissingBoundaryRestriction { field: usize },
    /// Work-group dimensions must be positive.
    EmptyBlock,
    /// An integral depends on a trial field that does not exist or is listed twice.
    InvalidDependency { field: usize },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quadrature(err) => write!(f, "quadrature: {}", err),
            Self::UnsupportedElement { geometry, family, order } => {
                write!(f, "no {:?} element of order {} for {:?} cells", family, order, geometry)
            }
            Self::UnsupportedOrder { order } => write!(f, "basis order must be at least 1, got {}", order),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, actual)
            }
            Self::NodeCountMismatch { expected, actual } => {
                write!(f, "expected {} nodes per element, got {}", expected, actual)
            }
            Self::ElementCountMismatch { expected, actual } => {
                write!(f, "expected {} elements, got {}", expected, actual)
            }
            Self::InvalidRestriction { reason } => write!(f, "invalid element restriction: {}", reason),
            Self::InputCount { expected, actual } => {
                write!(f, "expected {} input fields, got {}", expected, actual)
            }
            Self::InputLength { field, expected, actual } => {
                write!(f, "input field {} has length {}, expected {}", field, actual, expected)
            }
            Self::MultipleDifferentiationArguments => {
                write!(f, "at most one argument can be differentiated per evaluation")
            }
            Self::QuadratureDataMismatch { expected, actual } => write!(
                f,
                "quadrature data has {} elements with {} points each, expected {} elements with {} points",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::NonPositiveJacobian {
                element,
                point,
                determinant,
            } => write!(
                f,
                "Jacobian determinant {} at point {} of element {} is not positive",
                determinant, point, element
            ),
            Self::UnsupportedExecution { geometry } => {
                write!(f, "work-group execution is not available for {:?} cells", geometry)
            }
            Self::MissingBoundaryRestriction { field } => {
                write!(f, "field {} has no boundary restriction", field)
            }
            Self::EmptyBlock => write!(f, "work-group dimensions must be positive"),
            Self::InvalidDependency { field } => {
                write!(f, "integral cannot depend on trial field {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<tessera_quadrature::Error> for ConfigurationError {
    fn from(err: tessera_quadrature::Error) -> Self {
        Self::Quadrature(err)
    }
}
