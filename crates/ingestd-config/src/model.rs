//! Typed configuration sections deserialized from the daemon's TOML document.

use std::path::PathBuf;

use serde::Deserialize;

/// Root configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Photo-organizing pipeline configuration.
    pub photos: PhotosConfig,
    /// Media-import-guard pipeline configuration.
    pub media: MediaConfig,
    /// External alert transport configuration.
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// Configuration for the photos pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotosConfig {
    /// Watcher settings for the photo upload directories.
    pub watcher: WatcherConfig,
    /// Organizer settings.
    pub organizer: OrganizerConfig,
    /// Nextcloud rescan settings.
    pub nextcloud: NextcloudConfig,
}

/// Configuration for the media pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Watcher settings for the download/library directories.
    pub watcher: WatcherConfig,
    /// Scanner settings.
    pub scanner: ScannerConfig,
    /// Optional hardlink mover settings.
    #[serde(default)]
    pub mover: MoverConfig,
}

/// Directories under observation and their debounce behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    /// Absolute directories the watcher subscribes to.
    pub paths: Vec<PathBuf>,
    /// Quiet period after the last filesystem event before a file is
    /// considered stable, in milliseconds.
    pub debounce_ms: u64,
    /// Extensions that mark in-progress downloads; never promoted.
    #[serde(default = "default_ignore_extensions")]
    pub ignore_extensions: Vec<String>,
}

/// Destination layout and ownership for organized photos.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizerConfig {
    /// Whether the organizer stage moves files at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root of the date-bucketed photo tree.
    pub photos_dir: PathBuf,
    /// Filename prefix for photos.
    #[serde(default = "default_photo_prefix")]
    pub photo_prefix: String,
    /// Filename prefix for videos.
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,
    /// Extensions classified as photos.
    pub photo_extensions: Vec<String>,
    /// Extensions classified as videos.
    pub video_extensions: Vec<String>,
    /// Directory (relative to `photos_dir`) for files without a trustworthy
    /// capture datetime; `None` sorts them by mtime instead.
    #[serde(default)]
    pub unsorted_dir: Option<String>,
    /// Capture dates before this year are distrusted (epoch-reset cameras).
    #[serde(default = "default_min_valid_year")]
    pub min_valid_year: i32,
    /// Owner applied to organized files, when set.
    #[serde(default)]
    pub file_owner: Option<String>,
    /// Group applied to organized files, when set.
    #[serde(default)]
    pub file_group: Option<String>,
}

/// How to reach the Nextcloud container for incremental rescans.
#[derive(Debug, Clone, Deserialize)]
pub struct NextcloudConfig {
    /// Whether rescans are triggered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name of the running container.
    pub container_name: String,
    /// Nextcloud user owning the scanned files.
    pub username: String,
    /// Host path of the Nextcloud data directory.
    pub data_dir: PathBuf,
    /// Internal path prefix the host path maps onto.
    pub internal_prefix: String,
}

/// Validation policy for files entering the media pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Destination for rejected files.
    pub quarantine_dir: PathBuf,
    /// Extension allow-list; anything else is rejected.
    pub allowed_extensions: Vec<String>,
    /// Whether rule 3 (executable extension block-list) is active.
    #[serde(default = "default_true")]
    pub block_executables: bool,
    /// Whether junk files are deleted outright instead of rejected.
    #[serde(default)]
    pub delete_junk: bool,
    /// Extensions considered junk when `delete_junk` is set.
    #[serde(default = "default_junk_extensions")]
    pub junk_extensions: Vec<String>,
    /// Minimum plausible size for video files, in bytes.
    #[serde(default = "default_min_video_size")]
    pub min_video_size: u64,
    /// Whether directories left empty after cleanup are pruned up to the
    /// watch root (post-import-guard mode).
    #[serde(default)]
    pub post_import_guard: bool,
}

/// Optional hardlink stage from the download tree into the library tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoverConfig {
    /// Whether scanned files are linked into the destination tree.
    #[serde(default)]
    pub enabled: bool,
    /// Root the relative subpath is computed against.
    #[serde(default)]
    pub source: PathBuf,
    /// Root of the destination tree.
    #[serde(default)]
    pub destination: PathBuf,
}

/// ntfy-style push notification sink.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsConfig {
    /// Whether terminal events are forwarded to the transport.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the notification server.
    #[serde(default)]
    pub url: String,
    /// Topic appended to the URL.
    #[serde(default)]
    pub topic: String,
    /// Optional bearer token.
    #[serde(default)]
    pub token: Option<String>,
}

const fn default_true() -> bool {
    true
}

fn default_ignore_extensions() -> Vec<String> {
    ["part", "crdownload", "tmp", "download", "partial", "!qb"]
        .map(str::to_string)
        .to_vec()
}

fn default_photo_prefix() -> String {
    "IMG".to_string()
}

fn default_video_prefix() -> String {
    "VID".to_string()
}

const fn default_min_valid_year() -> i32 {
    2000
}

fn default_junk_extensions() -> Vec<String> {
    ["nfo", "sfv", "url", "lnk", "txt"].map(str::to_string).to_vec()
}

const fn default_min_video_size() -> u64 {
    1024
}
