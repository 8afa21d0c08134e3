//! Layered validation of files arriving in the media watch trees.
//!
//! Rules apply in a fixed order, first match wins: junk deletion, extension
//! allow-list, executable extension block-list, minimum video size, magic
//! byte cross-check, subtitle UTF-8 check. The magic-byte cross-check is the
//! decisive defense against executables renamed to media extensions; the
//! extension rules in front of it only exist to fail cheap and fail early.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ingestd_config::ScannerConfig;
use ingestd_events::{DeleteReason, FileReady, PipelineEvent, RejectReason, Stage, error_chain};
use ingestd_fsops::{collision_free_path, move_file, prune_empty_dirs};
use ingestd_sniff::DetectedType;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Files scanned concurrently before the stage awaits completions.
const MAX_IN_FLIGHT: usize = 8;

/// Extensions treated as executable or script formats.
const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "sh", "bash", "zsh", "py", "pyc", "pl", "rb", "jar", "app", "run",
];

/// Extensions the minimum-size rule treats as video.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v"];

/// Extensions that must decode as UTF-8 text.
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "ass", "ssa", "vtt"];

/// Outcome of the validation policy for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    /// File passed every rule and may be imported.
    Pass,
    /// File is rejected and belongs in quarantine.
    Reject(RejectReason),
    /// File is junk and is deleted outright.
    Delete(DeleteReason),
}

/// Scan inbound files until the channel closes.
///
/// `Pass` files are forwarded to the mover; every other verdict resolves to
/// a terminal event here. With `post_import_guard` set, directories left
/// empty by a deletion or quarantine are pruned up to the owning watch root.
pub async fn run(
    config: ScannerConfig,
    watch_roots: Vec<PathBuf>,
    mut rx: mpsc::Receiver<FileReady>,
    pass_tx: mpsc::Sender<PathBuf>,
    events_tx: mpsc::Sender<PipelineEvent>,
) {
    let config = Arc::new(config);
    let watch_roots = Arc::new(watch_roots);
    let mut tasks: JoinSet<()> = JoinSet::new();
    while let Some(ready) = rx.recv().await {
        while tasks.len() >= MAX_IN_FLIGHT {
            let _ = tasks.join_next().await;
        }
        let config = Arc::clone(&config);
        let watch_roots = Arc::clone(&watch_roots);
        let pass_tx = pass_tx.clone();
        let events_tx = events_tx.clone();
        tasks.spawn(async move {
            let (event, passed) = scan_one(&config, &watch_roots, ready.path).await;
            if let Some(path) = passed {
                if pass_tx.send(path).await.is_err() {
                    warn!("mover channel closed");
                }
            }
            if let Some(event) = event {
                if events_tx.send(event).await.is_err() {
                    warn!("event sink channel closed");
                }
            }
        });
    }
    while tasks.join_next().await.is_some() {}
}

/// Resolve one file to either a terminal event or a pass-through path.
async fn scan_one(
    config: &ScannerConfig,
    watch_roots: &[PathBuf],
    path: PathBuf,
) -> (Option<PipelineEvent>, Option<PathBuf>) {
    let verdict = match scan(&path, config).await {
        Ok(verdict) => verdict,
        Err(err) => {
            return (
                Some(PipelineEvent::Failed {
                    path,
                    stage: Stage::Scanner,
                    error: error_chain(&err),
                }),
                None,
            );
        }
    };
    match verdict {
        ScanVerdict::Pass => (None, Some(path)),
        ScanVerdict::Delete(reason) => match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), reason = reason.as_str(), "junk file deleted");
                if config.post_import_guard {
                    prune_upward(&path, watch_roots).await;
                }
                (Some(PipelineEvent::Deleted { path, reason }), None)
            }
            Err(err) => (
                Some(PipelineEvent::Failed {
                    path,
                    stage: Stage::Scanner,
                    error: error_chain(&err),
                }),
                None,
            ),
        },
        ScanVerdict::Reject(reason) => match quarantine(&path, &config.quarantine_dir).await {
            Ok(target) => {
                info!(
                    path = %path.display(),
                    quarantined_as = %target.display(),
                    reason = reason.as_str(),
                    "file quarantined"
                );
                if config.post_import_guard {
                    prune_upward(&path, watch_roots).await;
                }
                (Some(PipelineEvent::Quarantined { path, reason }), None)
            }
            Err(err) => (
                Some(PipelineEvent::Failed {
                    path,
                    stage: Stage::Scanner,
                    error: error_chain(&err),
                }),
                None,
            ),
        },
    }
}

/// Apply the validation policy to one file.
///
/// # Errors
///
/// Returns an error if the file cannot be statted or read; policy outcomes
/// are verdicts, never errors.
pub async fn scan(path: &Path, config: &ScannerConfig) -> MediaResult<ScanVerdict> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if config.delete_junk && matches_any(&extension, &config.junk_extensions) {
        return Ok(ScanVerdict::Delete(DeleteReason::JunkExtension));
    }
    if !matches_any(&extension, &config.allowed_extensions) {
        return Ok(ScanVerdict::Reject(RejectReason::DisallowedExtension));
    }
    if config.block_executables && EXECUTABLE_EXTENSIONS.contains(&extension.as_str()) {
        return Ok(ScanVerdict::Reject(RejectReason::BlockedExecutable));
    }
    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|source| MediaError::Io {
                operation: "stat scanned file",
                path: path.to_path_buf(),
                source,
            })?;
        if meta.len() < config.min_video_size {
            return Ok(ScanVerdict::Reject(RejectReason::Undersized));
        }
    }

    let owned = path.to_path_buf();
    let detected = tokio::task::spawn_blocking(move || ingestd_sniff::classify(&owned))
        .await
        .map_err(|_| MediaError::Io {
            operation: "classify header",
            path: path.to_path_buf(),
            source: std::io::Error::other("classify task panicked"),
        })??;
    if header_mismatch(&extension, detected) {
        debug!(
            path = %path.display(),
            claimed = extension,
            detected = detected.as_str(),
            "magic bytes contradict extension"
        );
        return Ok(ScanVerdict::Reject(RejectReason::HeaderMismatch));
    }

    if SUBTITLE_EXTENSIONS.contains(&extension.as_str()) {
        let bytes = tokio::fs::read(path).await.map_err(|source| MediaError::Io {
            operation: "read subtitle",
            path: path.to_path_buf(),
            source,
        })?;
        if std::str::from_utf8(&bytes).is_err() {
            return Ok(ScanVerdict::Reject(RejectReason::InvalidTextEncoding));
        }
    }

    Ok(ScanVerdict::Pass)
}

/// Whether a detected signature contradicts the claimed extension.
///
/// `Unknown` never contradicts anything: absence of a signature is not
/// proof of mischief, and plenty of legitimate formats have none.
fn header_mismatch(extension: &str, detected: DetectedType) -> bool {
    if detected == DetectedType::Unknown {
        return false;
    }
    if detected.is_executable() {
        return !EXECUTABLE_EXTENSIONS.contains(&extension);
    }
    match extension {
        "mkv" | "webm" => detected != DetectedType::Matroska,
        "mp4" | "m4v" | "mov" => detected != DetectedType::Mp4,
        "avi" => detected != DetectedType::Avi,
        "jpg" | "jpeg" => detected != DetectedType::Jpeg,
        "png" => detected != DetectedType::Png,
        "gif" => detected != DetectedType::Gif,
        "webp" => detected != DetectedType::Webp,
        "tif" | "tiff" => detected != DetectedType::Tiff,
        "heic" | "heif" | "avif" => detected != DetectedType::Heif,
        "zip" => detected != DetectedType::Zip,
        "rar" => detected != DetectedType::Rar,
        "7z" => detected != DetectedType::SevenZip,
        "gz" => detected != DetectedType::Gzip,
        "pdf" => detected != DetectedType::Pdf,
        _ => false,
    }
}

fn matches_any(extension: &str, list: &[String]) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(extension))
}

/// Move a rejected file into quarantine under its original name, probing
/// `_1`, `_2`, ... on collision.
async fn quarantine(path: &Path, quarantine_dir: &Path) -> ingestd_fsops::FsOpsResult<PathBuf> {
    let file_name = path.file_name().unwrap_or_else(|| OsStr::new("unnamed"));
    let target = collision_free_path(quarantine_dir, file_name).await?;
    move_file(path, &target).await?;
    Ok(target)
}

async fn prune_upward(path: &Path, watch_roots: &[PathBuf]) {
    let Some(root) = watch_roots.iter().find(|root| path.starts_with(root)) else {
        return;
    };
    let Some(parent) = path.parent() else {
        return;
    };
    let start = parent.to_path_buf();
    let root = root.clone();
    match tokio::task::spawn_blocking(move || prune_empty_dirs(&start, &root)).await {
        Ok(Ok(removed)) if removed > 0 => {
            debug!(removed, "pruned empty directories");
        }
        Ok(Ok(_)) => {}
        Ok(Err(err)) => warn!(error = %error_chain(&err), "empty-directory prune failed"),
        Err(_) => warn!("prune task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(quarantine_dir: &Path) -> ScannerConfig {
        ScannerConfig {
            quarantine_dir: quarantine_dir.to_path_buf(),
            allowed_extensions: ["mkv", "mp4", "avi", "srt", "jpg"]
                .map(str::to_string)
                .to_vec(),
            block_executables: true,
            delete_junk: true,
            junk_extensions: ["nfo", "sfv", "url", "lnk", "txt"].map(str::to_string).to_vec(),
            min_video_size: 1024,
            post_import_guard: false,
        }
    }

    fn pe_payload(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[0] = 0x4D;
        bytes[1] = 0x5A;
        bytes
    }

    fn matroska_payload(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[..4].copy_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]);
        bytes
    }

    #[tokio::test]
    async fn junk_extension_is_deleted_first() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("release.nfo");
        std::fs::write(&path, b"scene notes").unwrap();

        let config = test_config(quarantine.path());
        assert_eq!(
            scan(&path, &config).await.unwrap(),
            ScanVerdict::Delete(DeleteReason::JunkExtension)
        );

        let (event, passed) = scan_one(&config, &[], path.clone()).await;
        assert!(matches!(event, Some(PipelineEvent::Deleted { .. })));
        assert!(passed.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn junk_is_only_rejected_when_deletion_is_off() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("release.nfo");
        std::fs::write(&path, b"scene notes").unwrap();

        let mut config = test_config(quarantine.path());
        config.delete_junk = false;
        assert_eq!(
            scan(&path, &config).await.unwrap(),
            ScanVerdict::Reject(RejectReason::DisallowedExtension)
        );
    }

    #[tokio::test]
    async fn disallowed_extension_moves_to_quarantine_intact() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("tool.iso");
        std::fs::write(&path, b"disc image").unwrap();

        let config = test_config(quarantine.path());
        let (event, passed) = scan_one(&config, &[], path.clone()).await;
        match event {
            Some(PipelineEvent::Quarantined { reason, .. }) => {
                assert_eq!(reason, RejectReason::DisallowedExtension);
            }
            other => panic!("expected Quarantined, got {other:?}"),
        }
        assert!(passed.is_none());
        assert!(!path.exists());
        assert_eq!(
            std::fs::read(quarantine.path().join("tool.iso")).unwrap(),
            b"disc image"
        );
    }

    #[tokio::test]
    async fn executable_extension_is_blocked_even_when_allowed() {
        let quarantine = TempDir::new().unwrap();
        let mut config = test_config(quarantine.path());
        config.allowed_extensions.push("exe".to_string());
        let verdict = scan(Path::new("/downloads/setup.exe"), &config)
            .await
            .unwrap();
        assert_eq!(verdict, ScanVerdict::Reject(RejectReason::BlockedExecutable));
    }

    #[tokio::test]
    async fn undersized_video_is_rejected() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("sample.mkv");
        std::fs::write(&path, matroska_payload(500)).unwrap();

        let config = test_config(quarantine.path());
        assert_eq!(
            scan(&path, &config).await.unwrap(),
            ScanVerdict::Reject(RejectReason::Undersized)
        );
    }

    #[tokio::test]
    async fn pe_header_behind_mkv_extension_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("movie.mkv");
        std::fs::write(&path, pe_payload(50 * 1024)).unwrap();

        let config = test_config(quarantine.path());
        assert_eq!(
            scan(&path, &config).await.unwrap(),
            ScanVerdict::Reject(RejectReason::HeaderMismatch)
        );

        let (event, passed) = scan_one(&config, &[], path.clone()).await;
        match event {
            Some(PipelineEvent::Quarantined { reason, .. }) => {
                assert_eq!(reason, RejectReason::HeaderMismatch);
            }
            other => panic!("expected Quarantined, got {other:?}"),
        }
        assert!(passed.is_none());
        assert!(quarantine.path().join("movie.mkv").exists());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn genuine_matroska_passes() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("episode.mkv");
        std::fs::write(&path, matroska_payload(4096)).unwrap();

        let config = test_config(quarantine.path());
        assert_eq!(scan(&path, &config).await.unwrap(), ScanVerdict::Pass);

        let (event, passed) = scan_one(&config, &[], path.clone()).await;
        assert!(event.is_none());
        assert_eq!(passed, Some(path));
    }

    #[tokio::test]
    async fn unknown_signature_is_not_treated_as_mismatch() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let path = dir.path().join("episode.mkv");
        // No recognizable signature at all.
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let config = test_config(quarantine.path());
        assert_eq!(scan(&path, &config).await.unwrap(), ScanVerdict::Pass);
    }

    #[tokio::test]
    async fn subtitle_must_be_utf8() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let config = test_config(quarantine.path());

        let good = dir.path().join("episode.srt");
        std::fs::write(&good, "1\n00:00:01,000 --> 00:00:02,000\nhello\n").unwrap();
        assert_eq!(scan(&good, &config).await.unwrap(), ScanVerdict::Pass);

        let bad = dir.path().join("broken.srt");
        std::fs::write(&bad, [0xFF, 0xFE, 0x00, 0xD8]).unwrap();
        assert_eq!(
            scan(&bad, &config).await.unwrap(),
            ScanVerdict::Reject(RejectReason::InvalidTextEncoding)
        );
    }

    #[tokio::test]
    async fn quarantine_collisions_probe_suffixes() {
        let dir = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let config = test_config(quarantine.path());

        for content in [b"first".as_slice(), b"second".as_slice()] {
            let path = dir.path().join("tool.iso");
            std::fs::write(&path, content).unwrap();
            let (event, _) = scan_one(&config, &[], path).await;
            assert!(matches!(event, Some(PipelineEvent::Quarantined { .. })));
        }
        assert_eq!(
            std::fs::read(quarantine.path().join("tool.iso")).unwrap(),
            b"first"
        );
        assert_eq!(
            std::fs::read(quarantine.path().join("tool_1.iso")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn post_import_guard_prunes_emptied_directories() {
        let root = TempDir::new().unwrap();
        let quarantine = TempDir::new().unwrap();
        let nested = root.path().join("Show").join("Season 1");
        std::fs::create_dir_all(&nested).unwrap();
        let path = nested.join("sample.nfo");
        std::fs::write(&path, b"junk").unwrap();

        let mut config = test_config(quarantine.path());
        config.post_import_guard = true;
        let roots = vec![root.path().to_path_buf()];
        let (event, _) = scan_one(&config, &roots, path).await;
        assert!(matches!(event, Some(PipelineEvent::Deleted { .. })));
        assert!(!nested.exists());
        assert!(!root.path().join("Show").exists());
        assert!(root.path().exists());
    }

    #[test]
    fn header_expectations_cover_the_claimed_families() {
        assert!(header_mismatch("mkv", DetectedType::WindowsExecutable));
        assert!(header_mismatch("mp4", DetectedType::ElfExecutable));
        assert!(header_mismatch("mkv", DetectedType::Zip));
        assert!(header_mismatch("jpg", DetectedType::Png));
        assert!(!header_mismatch("mkv", DetectedType::Matroska));
        assert!(!header_mismatch("mov", DetectedType::Mp4));
        assert!(!header_mismatch("srt", DetectedType::Unknown));
        // An executable signature behind an executable extension is
        // consistent; rule 3 owns that case.
        assert!(!header_mismatch("exe", DetectedType::WindowsExecutable));
    }
}
