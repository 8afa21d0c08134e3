//! # Design
//!
//! - Constant-message errors with context fields, never interpolated paths.
//! - Validation failures name the section and field so the operator can fix
//!   the document without reading source code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or validating the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configuration file is not valid TOML for the expected model.
    #[error("failed to parse configuration file")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {message}")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Human-readable error description.
        message: String,
    },
}
