//! Watcher error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for watcher operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors produced by the filesystem watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The native watcher backend could not be created.
    #[error("failed to create filesystem watcher")]
    Init {
        /// Underlying notify error.
        source: notify::Error,
    },
    /// A configured directory could not be subscribed to.
    #[error("failed to subscribe to watch directory")]
    Subscribe {
        /// Directory that failed subscription.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },
    /// The downstream stage hung up before the watcher stopped.
    #[error("downstream stage channel closed")]
    ChannelClosed,
}
