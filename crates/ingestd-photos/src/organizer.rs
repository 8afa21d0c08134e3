//! Date-bucketed placement of classified media files.
//!
//! Destination layout: `<photos_dir>/<YYYY>/<YYYY>-<MM>/<PREFIX>_<YYYYMMDD>_<HHMMSS>.<ext>`.
//! Files without a capture time land in the unsorted directory under their
//! original name. Name collisions probe `_1`, `_2`, ... up to the shared
//! suffix cap; a byte-identical file already at the destination deletes the
//! source instead of stacking suffixed copies.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use ingestd_config::OrganizerConfig;
use ingestd_events::{DeleteReason, PipelineEvent, Stage, error_chain};
use ingestd_fsops::{
    FsOpsError, FsOpsResult, apply_ownership, collision_free_path, files_identical, move_file,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::metadata::ClassifiedFile;

/// Files organized concurrently before the stage awaits completions.
const MAX_IN_FLIGHT: usize = 8;

/// Organize classified files until the inbound channel closes.
///
/// Every inbound file resolves to exactly one terminal event on
/// `events_tx`; successful placements additionally push their destination
/// onto `rescan_tx` for the Nextcloud notifier. Each file is processed as
/// its own task so one slow move never stalls unrelated files.
pub async fn run(
    config: OrganizerConfig,
    mut rx: mpsc::Receiver<ClassifiedFile>,
    rescan_tx: mpsc::Sender<PathBuf>,
    events_tx: mpsc::Sender<PipelineEvent>,
) {
    let config = Arc::new(config);
    let mut tasks: JoinSet<()> = JoinSet::new();
    while let Some(file) = rx.recv().await {
        while tasks.len() >= MAX_IN_FLIGHT {
            let _ = tasks.join_next().await;
        }
        let config = Arc::clone(&config);
        let rescan_tx = rescan_tx.clone();
        let events_tx = events_tx.clone();
        tasks.spawn(async move {
            let (event, rescan) = organize_one(&config, file).await;
            if let Some(destination) = rescan {
                if rescan_tx.send(destination).await.is_err() {
                    warn!("rescan channel closed");
                }
            }
            if events_tx.send(event).await.is_err() {
                warn!("event sink channel closed");
            }
        });
    }
    while tasks.join_next().await.is_some() {}
}

/// Resolve one file to its terminal event and optional rescan target.
async fn organize_one(
    config: &OrganizerConfig,
    file: ClassifiedFile,
) -> (PipelineEvent, Option<PathBuf>) {
    let datetime = file.capture.map(|capture| capture.datetime);
    if !config.enabled {
        let destination = file.path.clone();
        return (
            PipelineEvent::Organized {
                path: file.path,
                destination,
                datetime,
            },
            None,
        );
    }
    match place(config, &file).await {
        Ok(Placement::Moved(destination)) => {
            info!(
                path = %file.path.display(),
                destination = %destination.display(),
                "organized"
            );
            (
                PipelineEvent::Organized {
                    path: file.path,
                    destination: destination.clone(),
                    datetime,
                },
                Some(destination),
            )
        }
        Ok(Placement::Duplicate) => {
            info!(path = %file.path.display(), "byte-identical duplicate removed");
            (
                PipelineEvent::Deleted {
                    path: file.path,
                    reason: DeleteReason::Duplicate,
                },
                None,
            )
        }
        Err(err) => (
            PipelineEvent::Failed {
                path: file.path,
                stage: Stage::Organizer,
                error: error_chain(&err),
            },
            None,
        ),
    }
}

enum Placement {
    Moved(PathBuf),
    Duplicate,
}

async fn place(config: &OrganizerConfig, file: &ClassifiedFile) -> FsOpsResult<Placement> {
    let (dir, base_name) = destination_parts(config, file);

    let primary = dir.join(&base_name);
    if tokio::fs::try_exists(&primary).await.unwrap_or(false)
        && files_identical(&file.path, &primary).await?
    {
        tokio::fs::remove_file(&file.path)
            .await
            .map_err(|source| FsOpsError::Io {
                operation: "remove duplicate source",
                path: file.path.clone(),
                source,
            })?;
        return Ok(Placement::Duplicate);
    }

    let target = collision_free_path(&dir, OsStr::new(&base_name)).await?;
    move_file(&file.path, &target).await?;
    if let Err(err) = apply_ownership(
        &target,
        config.file_owner.as_deref(),
        config.file_group.as_deref(),
    )
    .await
    {
        // Ownership is cosmetic for the photo tree; the move already
        // succeeded, so log and keep the terminal outcome.
        warn!(path = %target.display(), error = %error_chain(&err), "ownership not applied");
    }
    Ok(Placement::Moved(target))
}

fn destination_parts(config: &OrganizerConfig, file: &ClassifiedFile) -> (PathBuf, String) {
    file.capture.map_or_else(
        || {
            let unsorted = config.unsorted_dir.as_deref().unwrap_or("unsorted");
            let name = file.path.file_name().map_or_else(
                || "unnamed.bin".to_string(),
                |name| name.to_string_lossy().into_owned(),
            );
            (config.photos_dir.join(unsorted), name)
        },
        |capture| {
            let year = capture.datetime.year();
            let month = capture.datetime.month();
            let dir = config
                .photos_dir
                .join(year.to_string())
                .join(format!("{year}-{month:02}"));
            let stamp = capture.datetime.format("%Y%m%d_%H%M%S");
            let name = format!(
                "{}_{stamp}.{}",
                file.kind.prefix(config),
                normalized_extension(&file.path)
            );
            (dir, name)
        },
    )
}

fn normalized_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase()
}
