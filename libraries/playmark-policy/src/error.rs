//! Error types for policy configuration

use playmark_core::CatalogError;
use thiserror::Error;

/// Policy configuration errors, raised at load time
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// Selection weights do not sum to 1
    #[error("{name} weights sum to {sum}, expected 1")]
    InvalidWeights { name: &'static str, sum: f64 },

    /// A range is empty, inverted, or outside its allowed domain
    #[error("{name} range [{min}, {max}] is invalid")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// A probability is outside [0, 1]
    #[error("{name} probability {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },

    /// A mixture has no bands
    #[error("{0} mixture has no bands")]
    EmptyMixture(&'static str),

    /// A naming word list is empty
    #[error("{0} word list is empty")]
    EmptyWordList(&'static str),

    /// Completion code prefix is empty
    #[error("Completion code prefix must not be empty")]
    EmptyCodePrefix,

    /// The track catalog cannot produce a session order
    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
