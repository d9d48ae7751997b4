//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configured path does not exist.
    #[error("path does not exist: {path}")]
    PathNotFound { path: std::path::PathBuf },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A trait for validating configuration parameters.
///
/// Usually implemented through `#[derive(ConfigValidator)]`; the provided
/// methods cover checks the derive attributes cannot express.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that a path exists on disk.
    ///
    /// Used for dataset image directories and annotation manifests, which may
    /// be either files or directories.
    fn validate_existing_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}
