//! Photos pipeline error taxonomy.

use thiserror::Error;

/// Result type for photos pipeline stages.
pub type PhotosResult<T> = Result<T, PhotosError>;

/// Errors that abort a photos pipeline stage.
///
/// Per-file failures never surface here; they become terminal
/// `PipelineEvent::Failed` values instead.
#[derive(Debug, Error)]
pub enum PhotosError {
    /// A downstream stage hung up while this stage was still running.
    #[error("downstream stage channel closed")]
    ChannelClosed,
}
