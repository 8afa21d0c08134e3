//! Config and directory fixtures for end-to-end tests.

use std::path::{Path, PathBuf};

use ingestd_config::{
    AlertsConfig, Config, MediaConfig, MoverConfig, NextcloudConfig, OrganizerConfig,
    PhotosConfig, ScannerConfig, WatcherConfig,
};

/// On-disk layout created by [`daemon_fixture`].
#[derive(Debug)]
pub struct DaemonTree {
    /// Watched photo upload directory.
    pub photo_inbox: PathBuf,
    /// Root of the organized photo tree.
    pub photos_dir: PathBuf,
    /// Watched download directory.
    pub downloads: PathBuf,
    /// Quarantine directory for rejected files.
    pub quarantine: PathBuf,
    /// Hardlink destination tree.
    pub library: PathBuf,
}

/// Create the standard directory layout under `root` and a validated
/// configuration pointing at it. Alerting and Nextcloud are disabled so the
/// daemon exercises no external collaborators.
///
/// # Panics
///
/// Panics if the directories cannot be created; fixtures have no business
/// limping along on a broken tree.
#[must_use]
pub fn daemon_fixture(root: &Path, debounce_ms: u64) -> (Config, DaemonTree) {
    let tree = DaemonTree {
        photo_inbox: root.join("photo-inbox"),
        photos_dir: root.join("photos"),
        downloads: root.join("downloads"),
        quarantine: root.join("quarantine"),
        library: root.join("library"),
    };
    for dir in [
        &tree.photo_inbox,
        &tree.photos_dir,
        &tree.downloads,
        &tree.quarantine,
        &tree.library,
    ] {
        std::fs::create_dir_all(dir).expect("fixture directory");
    }

    let config = Config {
        photos: PhotosConfig {
            watcher: WatcherConfig {
                paths: vec![tree.photo_inbox.clone()],
                debounce_ms,
                ignore_extensions: vec!["part".to_string(), "tmp".to_string()],
            },
            organizer: OrganizerConfig {
                enabled: true,
                photos_dir: tree.photos_dir.clone(),
                photo_prefix: "IMG".to_string(),
                video_prefix: "VID".to_string(),
                photo_extensions: vec!["jpg".to_string(), "jpeg".to_string()],
                video_extensions: vec!["mp4".to_string(), "mov".to_string()],
                unsorted_dir: Some("unsorted".to_string()),
                min_valid_year: 2000,
                file_owner: None,
                file_group: None,
            },
            nextcloud: NextcloudConfig {
                enabled: false,
                container_name: "nextcloud".to_string(),
                username: "admin".to_string(),
                data_dir: tree.photos_dir.clone(),
                internal_prefix: "/admin/files".to_string(),
            },
        },
        media: MediaConfig {
            watcher: WatcherConfig {
                paths: vec![tree.downloads.clone()],
                debounce_ms,
                ignore_extensions: vec!["part".to_string(), "!qb".to_string()],
            },
            scanner: ScannerConfig {
                quarantine_dir: tree.quarantine.clone(),
                allowed_extensions: ["mkv", "mp4", "avi", "srt"].map(str::to_string).to_vec(),
                block_executables: true,
                delete_junk: true,
                junk_extensions: ["nfo", "sfv", "url", "lnk"].map(str::to_string).to_vec(),
                min_video_size: 1024,
                post_import_guard: false,
            },
            mover: MoverConfig {
                enabled: true,
                source: tree.downloads.clone(),
                destination: tree.library.clone(),
            },
        },
        alerts: AlertsConfig::default(),
    };
    config.validate().expect("fixture config validates");
    (config, tree)
}
