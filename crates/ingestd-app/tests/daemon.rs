//! End-to-end behaviour through the public supervisor wiring.

use std::time::Duration;

use ingestd_app::supervisor::spawn_pipelines;
use ingestd_test_support::{fixtures::daemon_fixture, payloads, wait};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

const SETTLE: Duration = Duration::from_millis(200);
const VERDICT: Duration = Duration::from_secs(10);

async fn drain(mut tasks: JoinSet<()>, shutdown_tx: &broadcast::Sender<()>) {
    shutdown_tx.send(()).expect("pipelines already gone");
    tokio::time::timeout(VERDICT, async {
        while tasks.join_next().await.is_some() {}
    })
    .await
    .expect("pipelines failed to drain");
}

#[tokio::test(flavor = "multi_thread")]
async fn daemon_routes_both_pipelines_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let (config, tree) = daemon_fixture(root.path(), 150);
    let (shutdown_tx, _) = broadcast::channel(1);
    let tasks = spawn_pipelines(config, &shutdown_tx);
    tokio::time::sleep(SETTLE).await;

    // Photo with no EXIF: the filename pattern decides the bucket.
    std::fs::write(
        tree.photo_inbox.join("IMG_20260211_143022.jpg"),
        payloads::jpeg_stub(2048),
    )
    .unwrap();
    let organized = tree
        .photos_dir
        .join("2026")
        .join("2026-02")
        .join("IMG_20260211_143022.jpg");
    assert!(wait::until(VERDICT, || organized.exists()).await);

    // PE executable disguised as a video ends in quarantine.
    std::fs::write(tree.downloads.join("movie.mkv"), payloads::pe_stub(50 * 1024)).unwrap();
    let quarantined = tree.quarantine.join("movie.mkv");
    assert!(wait::until(VERDICT, || quarantined.exists()).await);

    // Genuine matroska is linked into the library, source preserved.
    let source = tree.downloads.join("episode.mkv");
    std::fs::write(&source, payloads::matroska_stub(4096)).unwrap();
    let linked = tree.library.join("episode.mkv");
    assert!(wait::until(VERDICT, || linked.exists()).await);
    assert!(source.exists());

    drain(tasks, &shutdown_tx).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn junk_files_are_deleted_not_quarantined() {
    let root = tempfile::tempdir().unwrap();
    let (config, tree) = daemon_fixture(root.path(), 150);
    let (shutdown_tx, _) = broadcast::channel(1);
    let tasks = spawn_pipelines(config, &shutdown_tx);
    tokio::time::sleep(SETTLE).await;

    let junk = tree.downloads.join("release.nfo");
    std::fs::write(&junk, b"scene notes").unwrap();
    assert!(wait::until(VERDICT, || !junk.exists()).await);
    assert!(!tree.quarantine.join("release.nfo").exists());

    drain(tasks, &shutdown_tx).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn ignored_partial_downloads_survive_a_drain() {
    let root = tempfile::tempdir().unwrap();
    let (config, tree) = daemon_fixture(root.path(), 150);
    let (shutdown_tx, _) = broadcast::channel(1);
    let tasks = spawn_pipelines(config, &shutdown_tx);
    tokio::time::sleep(SETTLE).await;

    let partial = tree.downloads.join("movie.mkv.part");
    std::fs::write(&partial, payloads::matroska_stub(4096)).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    drain(tasks, &shutdown_tx).await;
    assert!(partial.exists());
    assert!(!tree.library.join("movie.mkv.part").exists());
}
