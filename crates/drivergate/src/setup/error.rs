//! Errors that abort setup.

use thiserror::Error;

/// Failures that abort setup outright.
///
/// Everything else degrades to a fallback; only a trusted driver package
/// with broken manifest metadata stops setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// A driver package passed every eligibility check but its manifest
    /// metadata is missing or malformed.
    #[error("driver package '{package}' has invalid metadata: {message}")]
    DriverMetadata {
        /// Driver package name.
        package: String,
        /// Description of the broken field.
        message: String,
    },
}
