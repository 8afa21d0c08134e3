//! Debounce loop that turns raw filesystem events into [`FileReady`] values.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use ingestd_config::WatcherConfig;
use ingestd_events::{FileReady, Pipeline, PipelineEvent, Stage};
use notify::{Event, EventKind, RecursiveMode, Watcher as _};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{WatchError, WatchResult};

/// Capacity of the bridge channel between the notify backend and the loop.
const RAW_EVENT_CAPACITY: usize = 1024;

/// Watch the configured directories until shutdown, emitting one
/// [`FileReady`] per path that stays quiet for the debounce window.
///
/// Existing files found at startup are seeded into the debounce map so a
/// restart never strands files that arrived while the daemon was down.
/// Promotion failures that are not simple disappearance produce a terminal
/// [`PipelineEvent::Failed`] on `events_tx`.
///
/// # Errors
///
/// Returns an error if the watch backend cannot be created, a configured
/// directory cannot be subscribed to, or a downstream channel closes while
/// the watcher is still running.
pub async fn run(
    config: WatcherConfig,
    pipeline: Pipeline,
    ready_tx: mpsc::Sender<FileReady>,
    events_tx: mpsc::Sender<PipelineEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> WatchResult<()> {
    let window = Duration::from_millis(config.debounce_ms);
    let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Result<Event>>(RAW_EVENT_CAPACITY);
    let mut backend = notify::recommended_watcher(move |result| {
        let _ = raw_tx.blocking_send(result);
    })
    .map_err(|source| WatchError::Init { source })?;
    for path in &config.paths {
        // Recursion covers nested library trees; a flat inbox watches
        // identically either way.
        backend
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Subscribe {
                path: path.clone(),
                source,
            })?;
    }

    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
    seed_existing(&config, window, &mut pending);
    info!(
        pipeline = pipeline.as_str(),
        dirs = config.paths.len(),
        seeded = pending.len(),
        "watcher started"
    );

    loop {
        let next = pending.values().copied().min();
        tokio::select! {
            maybe = raw_rx.recv() => match maybe {
                Some(Ok(event)) => absorb(&event, &config, window, &mut pending),
                Some(Err(err)) => warn!(error = %err, "watch backend error"),
                None => return Err(WatchError::ChannelClosed),
            },
            () = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                for path in take_due(&mut pending, Instant::now()) {
                    promote(path, pipeline, &ready_tx, &events_tx).await?;
                }
            }
            _ = shutdown.recv() => {
                // Promote what is already due; everything else is left for
                // the startup scan of the next run.
                for path in take_due(&mut pending, Instant::now()) {
                    promote(path, pipeline, &ready_tx, &events_tx).await?;
                }
                info!(
                    pipeline = pipeline.as_str(),
                    dropped = pending.len(),
                    "watcher stopped"
                );
                return Ok(());
            }
        }
    }
}

/// Seed the debounce map with files already present under the watch roots.
fn seed_existing(
    config: &WatcherConfig,
    window: Duration,
    pending: &mut HashMap<PathBuf, Instant>,
) {
    let deadline = Instant::now() + window;
    for root in &config.paths {
        for entry in WalkDir::new(root).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.into_path();
                    if is_eligible(&path, &config.paths, &config.ignore_extensions) {
                        pending.insert(path, deadline);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "startup scan error");
                }
            }
        }
    }
}

/// Fold one raw filesystem event into the debounce map.
fn absorb(
    event: &Event,
    config: &WatcherConfig,
    window: Duration,
    pending: &mut HashMap<PathBuf, Instant>,
) {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            let deadline = Instant::now() + window;
            for path in &event.paths {
                if is_eligible(path, &config.paths, &config.ignore_extensions) {
                    pending.insert(path.clone(), deadline);
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                pending.remove(path);
            }
        }
        _ => {}
    }
}

/// Remove and return every pending path whose deadline has passed.
fn take_due(pending: &mut HashMap<PathBuf, Instant>, now: Instant) -> Vec<PathBuf> {
    let due: Vec<PathBuf> = pending
        .iter()
        .filter_map(|(path, deadline)| (*deadline <= now).then(|| path.clone()))
        .collect();
    for path in &due {
        pending.remove(path);
    }
    due
}

/// Stat a quiesced path and hand it to the pipeline if it is still a file.
async fn promote(
    path: PathBuf,
    pipeline: Pipeline,
    ready_tx: &mpsc::Sender<FileReady>,
    events_tx: &mpsc::Sender<PipelineEvent>,
) -> WatchResult<()> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() && meta.len() == 0 => {
            debug!(path = %path.display(), "skipping zero-byte file");
        }
        Ok(meta) if meta.is_file() => {
            debug!(path = %path.display(), pipeline = pipeline.as_str(), "file ready");
            ready_tx
                .send(FileReady {
                    path,
                    discovered_at: Utc::now(),
                    pipeline,
                })
                .await
                .map_err(|_| WatchError::ChannelClosed)?;
        }
        Ok(_) => {
            debug!(path = %path.display(), "skipping non-regular path");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "path vanished before promotion");
        }
        Err(err) => {
            events_tx
                .send(PipelineEvent::Failed {
                    path,
                    stage: Stage::Watcher,
                    error: err.to_string(),
                })
                .await
                .map_err(|_| WatchError::ChannelClosed)?;
        }
    }
    Ok(())
}

fn is_eligible(path: &Path, roots: &[PathBuf], ignore_extensions: &[String]) -> bool {
    !is_hidden(path, roots) && !has_ignored_extension(path, ignore_extensions)
}

fn has_ignored_extension(path: &Path, ignore_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ignore_extensions
                .iter()
                .any(|ignored| ext.eq_ignore_ascii_case(ignored))
        })
}

/// Hidden means any dot-prefixed component below the watch root, so a hidden
/// watch root itself does not blind the watcher.
fn is_hidden(path: &Path, roots: &[PathBuf]) -> bool {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    relative
        .components()
        .any(|component| component.as_os_str().to_string_lossy().starts_with('.'))
}
