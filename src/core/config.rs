//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that validation failed.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// Error indicating that a required path does not exist.
    #[error("path does not exist: {}", path.display())]
    PathNotFound { path: std::path::PathBuf },
}

/// A trait for validating configuration parameters.
///
/// Implementors provide [`validate`](ConfigValidator::validate) and
/// [`get_defaults`](ConfigValidator::get_defaults); the remaining methods are
/// shared checks used by those implementations.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a rendering resolution in dots per inch.
    fn validate_dpi(&self, field: &str, dpi: u32) -> Result<(), ConfigError> {
        if dpi == 0 {
            return Err(ConfigError::InvalidConfig {
                message: format!("{field} must be greater than 0"),
            });
        }
        Ok(())
    }

    /// Validates a ratio in the half-open range `(0.0, 1.0]`.
    fn validate_ratio(&self, field: &str, value: f32) -> Result<(), ConfigError> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::InvalidConfig {
                message: format!("{field} must be in (0.0, 1.0], got {value}"),
            });
        }
        Ok(())
    }

    /// Validates that a path exists.
    fn validate_path_exists(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}
