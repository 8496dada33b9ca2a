//! Error type shared across the crate.
use thiserror::Error;

/// Custom error type for the pmodel-calib crate.
#[derive(Error, Debug)]
pub enum CalibError {
    /// A calibrated parameter has bounds or an initial value that cannot form a prior.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with its values.
        reason: String,
    },
    /// Sampler or parameter set settings that cannot be passed to the sampler.
    #[error("Invalid calibration settings: {0}")]
    InvalidSettings(String),
    /// A parameter is listed both as calibrated and as fixed.
    #[error("Parameter `{0}` is both calibrated and fixed.")]
    Overlap(String),
    /// The experiment variant has no implementation.
    #[error("Setup `{0}` is not implemented.")]
    Unimplemented(String),
    /// The calibration result does not hold the chain list the caller expects.
    #[error("Expected a list of sampler chains in the calibration output, found {0}.")]
    UnexpectedModel(String),
    /// Transparency must be a percentage.
    #[error("Transparency must lie within [0, 100], got {0}.")]
    InvalidPercent(f64),
    /// Color name not found in the color table.
    #[error("Unknown color `{0}`.")]
    UnknownColor(String),
    /// Sample matrices with mismatched shapes.
    #[error("Malformed samples: {0}")]
    Samples(String),
    /// The external calibration program failed.
    #[error("Calibration backend failed: {0}")]
    Collaborator(String),
    /// Error type from csv crate.
    #[error("Could not serialize/deserialize csv file: {0}")]
    Csv(#[from] csv::Error),
    /// Error type from serde_json.
    #[error("Could not serialize/deserialize json file: {0}")]
    Json(#[from] serde_json::Error),
    /// Error type from std::io.
    #[error("Could not access file: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, CalibError>`.
pub type Result<T> = std::result::Result<T, CalibError>;
