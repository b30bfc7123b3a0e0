//! Domain errors raised by package lookups.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from package metadata and asset lookups.
#[derive(Debug, Clone, Error)]
pub enum PackageError {
    /// No package with the given name is installed in the requested scope.
    #[error("package '{name}' not installed")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The package service could not answer the query.
    #[error("package lookup for '{name}' failed: {message}")]
    Lookup {
        /// Package being looked up.
        name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// The package does not ship the requested asset.
    #[error("package '{package}' has no asset '{asset}'")]
    AssetNotFound {
        /// Package whose assets were searched.
        package: String,
        /// Asset file name.
        asset: String,
    },

    /// An I/O error occurred while opening or reading a package file.
    #[error("I/O error reading '{name}' from package '{package}': {source}")]
    Io {
        /// Package owning the file.
        package: String,
        /// File or asset name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Package metadata failed validation on registration.
    #[error("invalid package metadata: {message}")]
    Invalid {
        /// Description of the validation failure.
        message: String,
    },
}

impl PackageError {
    /// Returns `true` for failures that mean "this package is unavailable".
    ///
    /// Lookup failures are treated like a missing package by callers.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Lookup { .. } | Self::AssetNotFound { .. }
        )
    }
}
