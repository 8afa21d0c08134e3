//! # Design
//!
//! - Constant-message errors carrying the failing operation and path.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the shared filesystem primitives.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The collision probe exhausted its suffix cap.
    #[error("too many filename collisions")]
    TooManyCollisions {
        /// Directory being probed.
        dir: PathBuf,
        /// Base filename that kept colliding.
        file_name: String,
    },
    /// A background filesystem task panicked.
    #[error("blocking filesystem task panicked")]
    TaskPanicked {
        /// Operation the task was performing.
        operation: &'static str,
    },
    /// User lookup failed when applying ownership changes.
    #[cfg(unix)]
    #[error("fsops user lookup failed")]
    UserLookup {
        /// Username that failed lookup.
        user: String,
        /// Underlying nix error.
        source: nix::Error,
    },
    /// Group lookup failed when applying ownership changes.
    #[cfg(unix)]
    #[error("fsops group lookup failed")]
    GroupLookup {
        /// Group name that failed lookup.
        group: String,
        /// Underlying nix error.
        source: nix::Error,
    },
    /// Named user or group does not exist.
    #[cfg(unix)]
    #[error("fsops unknown principal")]
    UnknownPrincipal {
        /// Whether the missing principal is a `user` or a `group`.
        kind: &'static str,
        /// Name that did not resolve.
        name: String,
    },
    /// Chown syscall failure.
    #[cfg(unix)]
    #[error("fsops chown failure")]
    Chown {
        /// Path being re-owned.
        path: PathBuf,
        /// Underlying nix error.
        source: nix::Error,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
