//! Loading the configuration document from disk.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;

impl Config {
    /// Read, parse, and validate the TOML document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not valid TOML for
    /// the configuration model, or violates a validation constraint. Any of
    /// these is fatal: the daemon refuses to run with undefined behaviour.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[photos.watcher]
paths = ["/srv/uploads"]
debounce_ms = 5000
ignore_extensions = ["part", "tmp"]

[photos.organizer]
photos_dir = "/srv/nextcloud-data/admin/files/Photos"
photo_extensions = ["jpg", "jpeg", "png", "heic"]
video_extensions = ["mp4", "mov"]
unsorted_dir = "Unsorted"
file_owner = "www-data"
file_group = "www-data"

[photos.nextcloud]
container_name = "nextcloud"
username = "admin"
data_dir = "/srv/nextcloud-data"
internal_prefix = "/admin/files"

[media.watcher]
paths = ["/srv/downloads/complete"]
debounce_ms = 10000

[media.scanner]
quarantine_dir = "/srv/quarantine"
allowed_extensions = ["mkv", "mp4", "srt"]
delete_junk = true

[media.mover]
enabled = true
source = "/srv/downloads/complete"
destination = "/srv/library"

[alerts]
enabled = true
url = "https://ntfy.example"
topic = "homelab"
token = "tk_secret"
"#;

    #[test]
    fn sample_document_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.photos.watcher.debounce_ms, 5_000);
        assert_eq!(config.photos.organizer.photo_prefix, "IMG");
        assert_eq!(config.photos.organizer.min_valid_year, 2000);
        assert_eq!(
            config.photos.organizer.unsorted_dir.as_deref(),
            Some("Unsorted")
        );
        assert!(config.media.scanner.block_executables);
        assert!(config.media.scanner.delete_junk);
        assert_eq!(config.media.scanner.min_video_size, 1024);
        assert!(config.media.mover.enabled);
        assert_eq!(config.alerts.token.as_deref(), Some("tk_secret"));
        // Media watcher fell back to the default ignore set.
        assert!(
            config
                .media
                .watcher
                .ignore_extensions
                .iter()
                .any(|ext| ext == "crdownload")
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn invalid_document_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE.replace("debounce_ms = 5000", "debounce_ms = 5")).unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }
}
