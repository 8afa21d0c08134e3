#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Typed events exchanged between pipeline stages.
//!
//! Stage boundaries are bounded `tokio::mpsc` channels so a slow consumer
//! applies backpressure to its producer instead of buffering without limit.
//! Every [`FileReady`] that enters a pipeline must resolve to exactly one
//! terminal [`PipelineEvent`]; stages that short-circuit send the terminal
//! event themselves rather than dropping the file silently.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Capacity of every inter-stage channel.
pub const STAGE_CHANNEL_CAPACITY: usize = 64;

/// Which of the two pipelines a watched directory feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Photo-organizing pipeline.
    Photos,
    /// Media-import-guard pipeline.
    Media,
}

impl Pipeline {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Media => "media",
        }
    }
}

/// Pipeline stage that produced a terminal event, used for failure provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Filesystem watcher.
    Watcher,
    /// Photo/video metadata extraction.
    Metadata,
    /// Date-bucketed photo organizer.
    Organizer,
    /// Nextcloud rescan notifier.
    Nextcloud,
    /// Media validation scanner.
    Scanner,
    /// Library hardlink mover.
    Mover,
}

impl Stage {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watcher => "watcher",
            Self::Metadata => "metadata",
            Self::Organizer => "organizer",
            Self::Nextcloud => "nextcloud",
            Self::Scanner => "scanner",
            Self::Mover => "mover",
        }
    }
}

/// Reason a file was rejected by the scanner and moved to quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Extension is not in the configured allow-list.
    DisallowedExtension,
    /// Extension matches a known executable or script format.
    BlockedExecutable,
    /// Video-like file below the minimum plausible size.
    Undersized,
    /// Magic bytes contradict the claimed extension.
    HeaderMismatch,
    /// Subtitle file is not valid UTF-8 text.
    InvalidTextEncoding,
}

impl RejectReason {
    /// Machine-friendly discriminator used in logs and alerts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisallowedExtension => "disallowed-extension",
            Self::BlockedExecutable => "blocked-executable",
            Self::Undersized => "undersized",
            Self::HeaderMismatch => "header-mismatch",
            Self::InvalidTextEncoding => "invalid-text-encoding",
        }
    }
}

/// Reason a file was deleted instead of processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteReason {
    /// Extension is in the configured junk set.
    JunkExtension,
    /// Destination already holds a byte-identical copy.
    Duplicate,
}

impl DeleteReason {
    /// Machine-friendly discriminator used in logs and alerts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JunkExtension => "junk-extension",
            Self::Duplicate => "duplicate",
        }
    }
}

/// A path that has been quiescent for its debounce window and is ready for
/// processing. Moved, never cloned, across the watcher→stage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReady {
    /// Absolute path of the stable file.
    pub path: PathBuf,
    /// Moment the watcher promoted the path.
    pub discovered_at: DateTime<Utc>,
    /// Pipeline the originating watch directory feeds.
    pub pipeline: Pipeline,
}

/// Terminal outcome for one file that entered a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// File was relocated into its final home.
    Organized {
        /// Original path of the file.
        path: PathBuf,
        /// Path the file now lives at.
        destination: PathBuf,
        /// Capture datetime used to bucket the file, when one was derived.
        datetime: Option<DateTime<FixedOffset>>,
    },
    /// File was rejected and moved into the quarantine directory.
    Quarantined {
        /// Original path of the file.
        path: PathBuf,
        /// Why the scanner rejected the file.
        reason: RejectReason,
    },
    /// File was removed from disk.
    Deleted {
        /// Original path of the file.
        path: PathBuf,
        /// Why the file was deleted.
        reason: DeleteReason,
    },
    /// Processing failed; the file is left where the failing stage found it.
    Failed {
        /// Path the failure applies to.
        path: PathBuf,
        /// Stage that encountered the failure.
        stage: Stage,
        /// Human-readable failure description.
        error: String,
    },
}

impl PipelineEvent {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Organized { .. } => "organized",
            Self::Quarantined { .. } => "quarantined",
            Self::Deleted { .. } => "deleted",
            Self::Failed { .. } => "failed",
        }
    }

    /// Path the event applies to.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Organized { path, .. }
            | Self::Quarantined { path, .. }
            | Self::Deleted { path, .. }
            | Self::Failed { path, .. } => path,
        }
    }
}

/// Construct a bounded stage channel with the standard capacity.
#[must_use]
pub fn stage_channel<T>() -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(STAGE_CHANNEL_CAPACITY)
}

/// Render an error and its source chain for a terminal event payload.
///
/// Stage errors carry constant messages with structured context; the chain
/// is flattened here so alerts stay readable without the error types.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_are_stable() {
        let organized = PipelineEvent::Organized {
            path: PathBuf::from("/in/a.jpg"),
            destination: PathBuf::from("/out/a.jpg"),
            datetime: None,
        };
        assert_eq!(organized.kind(), "organized");
        assert_eq!(organized.path(), &PathBuf::from("/in/a.jpg"));

        let failed = PipelineEvent::Failed {
            path: PathBuf::from("/in/b.mkv"),
            stage: Stage::Scanner,
            error: "boom".to_string(),
        };
        assert_eq!(failed.kind(), "failed");
        assert_eq!(Stage::Scanner.as_str(), "scanner");
    }

    #[test]
    fn reasons_serialize_kebab_case() {
        let json = serde_json::to_string(&RejectReason::HeaderMismatch).unwrap();
        assert_eq!(json, "\"header-mismatch\"");
        assert_eq!(RejectReason::HeaderMismatch.as_str(), "header-mismatch");

        let json = serde_json::to_string(&DeleteReason::JunkExtension).unwrap();
        assert_eq!(json, "\"junk-extension\"");
    }

    #[test]
    fn events_round_trip_through_serde() {
        let event = PipelineEvent::Quarantined {
            path: PathBuf::from("/downloads/movie.mkv"),
            reason: RejectReason::HeaderMismatch,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn error_chain_flattens_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let outer = std::io::Error::other(inner);
        assert_eq!(error_chain(&outer), "denied: denied");
    }

    #[tokio::test]
    async fn stage_channel_moves_events() {
        let (tx, mut rx) = stage_channel::<FileReady>();
        tx.send(FileReady {
            path: PathBuf::from("/in/a.jpg"),
            discovered_at: Utc::now(),
            pipeline: Pipeline::Photos,
        })
        .await
        .unwrap();
        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.pipeline, Pipeline::Photos);
    }
}
