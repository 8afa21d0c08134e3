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

//! Terminal event sink: structured logging plus ntfy push notifications.
//!
//! Every terminal event is logged unconditionally. When alerting is
//! enabled, organized files and security-relevant outcomes are additionally
//! POSTed to an ntfy topic; delivery is best-effort and a failed POST is
//! only logged.

use ingestd_config::AlertsConfig;
use ingestd_events::PipelineEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// ntfy priority tier attached to a pushed alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    /// Security-relevant or failed outcomes.
    High,
    /// Informational outcomes.
    Default,
}

impl Priority {
    const fn header_value(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Default => "default",
        }
    }
}

/// Consume terminal events from both pipelines until the channel closes.
pub async fn run(config: AlertsConfig, mut rx: mpsc::Receiver<PipelineEvent>) {
    let client = reqwest::Client::new();
    while let Some(event) = rx.recv().await {
        log_event(&event);
        if !config.enabled {
            continue;
        }
        let Some((message, priority)) = summarize(&event) else {
            continue;
        };
        if let Err(err) = push(&client, &config, &message, priority).await {
            warn!(error = %err, "alert delivery failed");
        }
    }
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Organized {
            path, destination, ..
        } => {
            info!(
                kind = event.kind(),
                path = %path.display(),
                destination = %destination.display(),
                "file organized"
            );
        }
        PipelineEvent::Deleted { path, reason } => {
            info!(
                kind = event.kind(),
                path = %path.display(),
                reason = reason.as_str(),
                "file deleted"
            );
        }
        PipelineEvent::Quarantined { path, reason } => {
            warn!(
                kind = event.kind(),
                path = %path.display(),
                reason = reason.as_str(),
                "file quarantined"
            );
        }
        PipelineEvent::Failed { path, stage, error } => {
            error!(
                kind = event.kind(),
                path = %path.display(),
                stage = stage.as_str(),
                error = %error,
                "file processing failed"
            );
        }
    }
}

/// Human-readable summary and priority for events worth pushing.
///
/// Deletions are routine housekeeping and stay in the log.
fn summarize(event: &PipelineEvent) -> Option<(String, Priority)> {
    match event {
        PipelineEvent::Organized {
            path, destination, ..
        } => {
            let name = path.file_name().map_or_else(
                || path.display().to_string(),
                |name| name.to_string_lossy().into_owned(),
            );
            Some((
                format!("Organized: {name} -> {}", destination.display()),
                Priority::Default,
            ))
        }
        PipelineEvent::Quarantined { path, reason } => Some((
            format!("Quarantined ({}): {}", reason.as_str(), path.display()),
            Priority::High,
        )),
        PipelineEvent::Failed { path, stage, error } => Some((
            format!("Failed at {}: {}: {error}", stage.as_str(), path.display()),
            Priority::High,
        )),
        PipelineEvent::Deleted { .. } => None,
    }
}

async fn push(
    client: &reqwest::Client,
    config: &AlertsConfig,
    message: &str,
    priority: Priority,
) -> Result<(), reqwest::Error> {
    let mut request = client
        .post(format!(
            "{}/{}",
            config.url.trim_end_matches('/'),
            config.topic
        ))
        .header("Priority", priority.header_value())
        .body(message.to_string());
    if let Some(token) = &config.token {
        request = request.bearer_auth(token);
    }
    request.send().await?.error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestd_events::{DeleteReason, RejectReason, Stage};
    use std::path::PathBuf;

    #[test]
    fn organized_events_push_at_default_priority() {
        let event = PipelineEvent::Organized {
            path: PathBuf::from("/in/IMG_20260211_143022.jpg"),
            destination: PathBuf::from("/photos/2026/2026-02/IMG_20260211_143022.jpg"),
            datetime: None,
        };
        let (message, priority) = summarize(&event).unwrap();
        assert_eq!(
            message,
            "Organized: IMG_20260211_143022.jpg -> /photos/2026/2026-02/IMG_20260211_143022.jpg"
        );
        assert_eq!(priority, Priority::Default);
    }

    #[test]
    fn quarantines_and_failures_push_high() {
        let quarantined = PipelineEvent::Quarantined {
            path: PathBuf::from("/downloads/movie.mkv"),
            reason: RejectReason::HeaderMismatch,
        };
        let (message, priority) = summarize(&quarantined).unwrap();
        assert!(message.contains("header-mismatch"));
        assert_eq!(priority, Priority::High);

        let failed = PipelineEvent::Failed {
            path: PathBuf::from("/in/a.jpg"),
            stage: Stage::Organizer,
            error: "disk full".to_string(),
        };
        let (message, priority) = summarize(&failed).unwrap();
        assert!(message.contains("organizer"));
        assert!(message.contains("disk full"));
        assert_eq!(priority, Priority::High);
    }

    #[test]
    fn deletions_stay_in_the_log() {
        let event = PipelineEvent::Deleted {
            path: PathBuf::from("/downloads/release.nfo"),
            reason: DeleteReason::JunkExtension,
        };
        assert!(summarize(&event).is_none());
    }

    #[tokio::test]
    async fn disabled_sink_drains_without_pushing() {
        let config = AlertsConfig::default();
        let (tx, rx) = mpsc::channel(4);
        let sink = tokio::spawn(run(config, rx));
        tx.send(PipelineEvent::Failed {
            path: PathBuf::from("/in/a.jpg"),
            stage: Stage::Watcher,
            error: "boom".to_string(),
        })
        .await
        .unwrap();
        drop(tx);
        sink.await.unwrap();
    }
}
