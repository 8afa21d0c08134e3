//! Incremental Nextcloud rescans for organized files.
//!
//! Nextcloud only notices externally-written files after `occ files:scan`.
//! The notifier translates each destination into the container's internal
//! path and execs the scan inside the running container. Failures are
//! logged and dropped; the file's terminal outcome was already decided by
//! the organizer.

use std::io;
use std::path::{Path, PathBuf};

use ingestd_config::NextcloudConfig;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Trigger one rescan per placed file until the inbound channel closes.
pub async fn run(config: NextcloudConfig, mut rx: mpsc::Receiver<PathBuf>) {
    while let Some(path) = rx.recv().await {
        if !config.enabled {
            continue;
        }
        let Some(internal) = translate_path(&path, &config) else {
            warn!(
                path = %path.display(),
                data_dir = %config.data_dir.display(),
                "destination is outside the nextcloud data dir"
            );
            continue;
        };
        if let Err(err) = trigger_rescan(&config, &internal).await {
            warn!(path = internal, error = %err, "could not exec occ files:scan");
        }
    }
}

/// Map a host destination onto the path Nextcloud knows it by.
///
/// `<data_dir>/<user>/files/Photos/a.jpg` becomes
/// `<internal_prefix>/Photos/a.jpg`; paths under `data_dir` but outside the
/// user's files tree keep their relative form.
fn translate_path(host_path: &Path, config: &NextcloudConfig) -> Option<String> {
    let relative = host_path.strip_prefix(&config.data_dir).ok()?;
    let relative = relative.to_str()?;
    let user_prefix = format!("{}/files/", config.username);
    let trimmed = relative.strip_prefix(&user_prefix).unwrap_or(relative);
    Some(format!(
        "{}/{trimmed}",
        config.internal_prefix.trim_end_matches('/')
    ))
}

async fn trigger_rescan(config: &NextcloudConfig, internal: &str) -> io::Result<()> {
    let output = tokio::process::Command::new("docker")
        .args(["exec", &config.container_name, "php", "occ", "files:scan"])
        .arg(format!("--path={internal}"))
        .output()
        .await?;
    if output.status.success() {
        info!(path = internal, "nextcloud rescan triggered");
    } else {
        warn!(
            path = internal,
            code = output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "occ files:scan reported failure"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NextcloudConfig {
        NextcloudConfig {
            enabled: true,
            container_name: "nextcloud".to_string(),
            username: "admin".to_string(),
            data_dir: PathBuf::from("/mnt/hot/nextcloud-data"),
            internal_prefix: "/admin/files".to_string(),
        }
    }

    #[test]
    fn translates_paths_under_the_user_files_tree() {
        let config = test_config();
        let host = Path::new(
            "/mnt/hot/nextcloud-data/admin/files/Photos/2026/2026-02/IMG_20260211_143022.jpg",
        );
        assert_eq!(
            translate_path(host, &config).unwrap(),
            "/admin/files/Photos/2026/2026-02/IMG_20260211_143022.jpg"
        );
    }

    #[test]
    fn keeps_relative_form_outside_the_user_tree() {
        let config = test_config();
        let host = Path::new("/mnt/hot/nextcloud-data/shared/group.jpg");
        assert_eq!(
            translate_path(host, &config).unwrap(),
            "/admin/files/shared/group.jpg"
        );
    }

    #[test]
    fn rejects_paths_outside_the_data_dir() {
        let config = test_config();
        assert!(translate_path(Path::new("/srv/other/a.jpg"), &config).is_none());
    }

    #[test]
    fn trailing_slash_on_the_prefix_is_tolerated() {
        let mut config = test_config();
        config.internal_prefix = "/admin/files/".to_string();
        let host = Path::new("/mnt/hot/nextcloud-data/admin/files/a.jpg");
        assert_eq!(translate_path(host, &config).unwrap(), "/admin/files/a.jpg");
    }

    #[tokio::test]
    async fn disabled_notifier_drains_without_exec() {
        let mut config = test_config();
        config.enabled = false;
        let (tx, rx) = mpsc::channel(4);
        let stage = tokio::spawn(run(config, rx));
        tx.send(PathBuf::from("/mnt/hot/nextcloud-data/admin/files/a.jpg"))
            .await
            .unwrap();
        drop(tx);
        stage.await.unwrap();
    }
}
