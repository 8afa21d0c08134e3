//! Hardlink import of scanner-passed files into the library tree.
//!
//! A hardlink keeps the source alive for the download client that still
//! tracks it; cleanup of the source belongs to that client, not this
//! daemon. Cross-device links fall back to a plain copy.

use std::path::PathBuf;
use std::sync::Arc;

use ingestd_config::MoverConfig;
use ingestd_events::{PipelineEvent, Stage, error_chain};
use ingestd_fsops::hardlink_or_copy;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Files moved concurrently before the stage awaits completions.
const MAX_IN_FLIGHT: usize = 8;

/// Link scanner-passed files into the destination tree until the channel
/// closes, emitting the terminal event for every file it receives.
///
/// A disabled mover, a file outside the configured source root, and an
/// already-present destination all resolve to `Organized` without touching
/// the filesystem; the file passed validation and stays where it is.
pub async fn run(
    config: MoverConfig,
    mut rx: mpsc::Receiver<PathBuf>,
    events_tx: mpsc::Sender<PipelineEvent>,
) {
    let config = Arc::new(config);
    let mut tasks: JoinSet<()> = JoinSet::new();
    while let Some(path) = rx.recv().await {
        while tasks.len() >= MAX_IN_FLIGHT {
            let _ = tasks.join_next().await;
        }
        let config = Arc::clone(&config);
        let events_tx = events_tx.clone();
        tasks.spawn(async move {
            let event = move_one(&config, path).await;
            if events_tx.send(event).await.is_err() {
                warn!("event sink channel closed");
            }
        });
    }
    while tasks.join_next().await.is_some() {}
}

async fn move_one(config: &MoverConfig, path: PathBuf) -> PipelineEvent {
    if !config.enabled {
        return accepted_in_place(path);
    }
    let Ok(relative) = path.strip_prefix(&config.source) else {
        return accepted_in_place(path);
    };
    let destination = config.destination.join(relative);
    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        return PipelineEvent::Organized {
            path,
            destination,
            datetime: None,
        };
    }
    match hardlink_or_copy(&path, &destination).await {
        Ok(()) => {
            info!(
                path = %path.display(),
                destination = %destination.display(),
                "linked into library"
            );
            PipelineEvent::Organized {
                path,
                destination,
                datetime: None,
            }
        }
        Err(err) => PipelineEvent::Failed {
            path,
            stage: Stage::Mover,
            error: error_chain(&err),
        },
    }
}

fn accepted_in_place(path: PathBuf) -> PipelineEvent {
    PipelineEvent::Organized {
        destination: path.clone(),
        path,
        datetime: None,
    }
}
