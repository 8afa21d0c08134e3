//! Stage wiring for both pipelines.
//!
//! Drain protocol: the watchers are the only stages that listen for the
//! shutdown broadcast. When a watcher returns it drops its outbound sender,
//! and channel closure cascades stage by stage down to the alert sink, so
//! every in-flight file reaches a terminal event before the task set
//! empties.

use std::time::Duration;

use ingestd_config::{Config, MediaConfig, PhotosConfig};
use ingestd_events::{Pipeline, PipelineEvent, error_chain, stage_channel};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::error;

/// Time allowed for the stages to drain after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawn both pipelines and the alert sink onto one task set.
///
/// The returned set empties once every stage has drained after a shutdown
/// broadcast.
#[must_use]
pub fn spawn_pipelines(config: Config, shutdown: &broadcast::Sender<()>) -> JoinSet<()> {
    let mut tasks = JoinSet::new();
    let (events_tx, events_rx) = stage_channel::<PipelineEvent>();

    spawn_photos_pipeline(&mut tasks, config.photos, shutdown, events_tx.clone());
    spawn_media_pipeline(&mut tasks, config.media, shutdown, events_tx);
    tasks.spawn(ingestd_alerts::run(config.alerts, events_rx));
    tasks
}

fn spawn_photos_pipeline(
    tasks: &mut JoinSet<()>,
    config: PhotosConfig,
    shutdown: &broadcast::Sender<()>,
    events_tx: mpsc::Sender<PipelineEvent>,
) {
    let (ready_tx, ready_rx) = stage_channel();
    let (classified_tx, classified_rx) = stage_channel();
    let (rescan_tx, rescan_rx) = stage_channel();

    let watcher_config = config.watcher;
    let watcher_events = events_tx.clone();
    let shutdown_rx = shutdown.subscribe();
    tasks.spawn(async move {
        if let Err(err) = ingestd_watch::run(
            watcher_config,
            Pipeline::Photos,
            ready_tx,
            watcher_events,
            shutdown_rx,
        )
        .await
        {
            error!(
                pipeline = Pipeline::Photos.as_str(),
                error = %error_chain(&err),
                "watcher stopped abnormally"
            );
        }
    });

    let metadata_config = config.organizer.clone();
    let metadata_events = events_tx.clone();
    tasks.spawn(async move {
        if let Err(err) =
            ingestd_photos::metadata::run(metadata_config, ready_rx, classified_tx, metadata_events)
                .await
        {
            error!(
                pipeline = Pipeline::Photos.as_str(),
                error = %error_chain(&err),
                "metadata stage stopped abnormally"
            );
        }
    });

    tasks.spawn(ingestd_photos::organizer::run(
        config.organizer,
        classified_rx,
        rescan_tx,
        events_tx,
    ));
    tasks.spawn(ingestd_photos::nextcloud::run(config.nextcloud, rescan_rx));
}

fn spawn_media_pipeline(
    tasks: &mut JoinSet<()>,
    config: MediaConfig,
    shutdown: &broadcast::Sender<()>,
    events_tx: mpsc::Sender<PipelineEvent>,
) {
    let (ready_tx, ready_rx) = stage_channel();
    let (pass_tx, pass_rx) = stage_channel();
    let watch_roots = config.watcher.paths.clone();

    let watcher_config = config.watcher;
    let watcher_events = events_tx.clone();
    let shutdown_rx = shutdown.subscribe();
    tasks.spawn(async move {
        if let Err(err) = ingestd_watch::run(
            watcher_config,
            Pipeline::Media,
            ready_tx,
            watcher_events,
            shutdown_rx,
        )
        .await
        {
            error!(
                pipeline = Pipeline::Media.as_str(),
                error = %error_chain(&err),
                "watcher stopped abnormally"
            );
        }
    });

    tasks.spawn(ingestd_media::scanner::run(
        config.scanner,
        watch_roots,
        ready_rx,
        pass_tx,
        events_tx.clone(),
    ));
    tasks.spawn(ingestd_media::mover::run(config.mover, pass_rx, events_tx));
}
