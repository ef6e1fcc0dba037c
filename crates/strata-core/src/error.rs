//! Error types for strata operations

use thiserror::Error;

/// Core strata errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrataError {
    // Input shape and cardinality errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("New dimension position {position} incompatible with array of {ndim} dimensions")]
    PositionOutOfRange { position: usize, ndim: usize },

    #[error("No vertical levels between the provided bounds {lower}, {upper}")]
    NoLevelsInRange { lower: f64, upper: f64 },

    // Missing metadata errors
    #[error("Coordinate not found: {0}")]
    CoordinateNotFound(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    // Semantic errors
    #[error("Invalid coordinate: {0}")]
    Coordinate(String),

    #[error("Array with mismatching {0} bounds ranges cannot be blended")]
    MismatchedBounds(String),

    #[error("Cannot expand bounds of {0} for a mixture of bounded / unbounded coordinates")]
    MixedBounds(String),

    #[error("Merge failed: {0}")]
    Merge(String),

    #[error("Unknown aggregator {name:?}, method must be one of {expected:?}")]
    UnknownAggregator {
        name: String,
        expected: Vec<&'static str>,
    },
}

/// Result type for strata operations
pub type StrataResult<T> = Result<T, StrataError>;

pub fn invalid<S: Into<String>>(msg: S) -> StrataError {
    StrataError::InvalidInput(msg.into())
}

pub fn merge_failure<S: Into<String>>(msg: S) -> StrataError {
    StrataError::Merge(msg.into())
}

pub fn not_found<S: Into<String>>(name: S) -> StrataError {
    StrataError::CoordinateNotFound(name.into())
}
