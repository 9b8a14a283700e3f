//! Error types for inference operations.

use thiserror::Error;

use crate::inference::Method;

/// Errors raised while normalizing inputs or running inference.
///
/// Every variant is a caller error detected before iteration begins.
/// Running out of iterations is not an error; see
/// [`SolveReport::converged`](crate::inference::SolveReport::converged).
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The method is a recognized selector without an implementation.
    #[error("{0} inference is not implemented")]
    NotImplemented(Method),

    /// The method name does not match any known selector.
    #[error("unknown inference method `{0}`")]
    UnknownMethod(String),

    /// Cardinalities inferred from the likelihood disagree with another input.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Which input was being checked
        context: String,
        /// Shape implied by the likelihood model
        expected: String,
        /// Shape actually supplied
        found: String,
    },

    /// A hidden-state factor has no states.
    #[error("hidden-state factor {factor} has zero cardinality")]
    EmptyFactor {
        /// Index of the offending factor
        factor: usize,
    },

    /// The likelihood model has no modalities or no hidden-state factors.
    #[error("likelihood model must have at least one modality and one hidden-state factor")]
    EmptyModel,

    /// A tensor that should hold probabilities does not.
    #[error("{context} is not a valid probability tensor: {reason}")]
    InvalidProbability {
        /// Which tensor was being checked
        context: String,
        /// What was wrong with it
        reason: String,
    },

    /// An observation index exceeds the modality's outcome count.
    #[error("observation index {index} out of range for modality {modality} with {outcomes} outcomes")]
    ObservationOutOfRange {
        /// Modality index
        modality: usize,
        /// Supplied outcome index
        index: usize,
        /// Number of outcomes in the modality
        outcomes: usize,
    },

    /// A prior vector contains non-finite entries.
    #[error("invalid prior for factor {factor}: {reason}")]
    InvalidPrior {
        /// Factor index
        factor: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Solver settings are out of range.
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// An internal reshape failed.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, InferenceError>;
