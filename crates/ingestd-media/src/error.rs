//! Media pipeline error taxonomy.

use std::io;
use std::path::PathBuf;

use ingestd_sniff::SniffError;
use thiserror::Error;

/// Result type for media pipeline operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors raised while scanning or moving a media file.
#[derive(Debug, Error)]
pub enum MediaError {
    /// IO failure while inspecting a file.
    #[error("media scan io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The header inspector could not read the file.
    #[error("header inspection failed")]
    Sniff(#[from] SniffError),
}
