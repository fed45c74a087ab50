use thiserror::Error;

use crate::regression::{normalizer::NormalizationError, solver::SolverError};

/// Failures surfaced by the valuation engine.
///
/// Training failures are reported through `TrainingResult::error`; only
/// [`ValuationError::NotTrained`] is returned as an `Err` by the query
/// operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    /// Empty feature list.
    #[error("at least one feature must be selected")]
    NoFeatures,
    /// Too few records to fit a model.
    #[error("insufficient data for reliable training (minimum {required} properties required)")]
    InsufficientData {
        /// Configured minimum.
        required: usize,
        /// Records supplied.
        provided: usize,
    },
    /// A feature or the target is missing from too many records.
    #[error("selected features have too many missing values")]
    InsufficientCoverage {
        /// Feature name, or `assessedValue` for the target.
        attribute: String,
        /// Fraction of records where the attribute is present.
        ratio: f64,
    },
    /// Normalization or solving failed.
    #[error("training failed: {0}")]
    Computation(String),
    /// Query issued before a successful `train`.
    #[error("model has not been trained")]
    NotTrained,
}

impl From<SolverError> for ValuationError {
    fn from(err: SolverError) -> Self {
        Self::Computation(err.to_string())
    }
}

impl From<NormalizationError> for ValuationError {
    fn from(err: NormalizationError) -> Self {
        Self::Computation(err.to_string())
    }
}

/// Result alias for engine operations.
pub type ValuationResult<T> = Result<T, ValuationError>;
