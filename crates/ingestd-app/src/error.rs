//! # Design
//!
//! - Centralize fatal startup errors; anything after startup is per-file and
//!   flows through the event sink instead.
//! - Keep error messages constant while carrying context fields.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Fatal application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ingestd_config::ConfigError,
    },
    /// Logging initialisation failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: anyhow::Error,
    },
    /// A shutdown signal handler could not be installed.
    #[error("signal handler installation failed")]
    Signal {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
}
