//! Startup validation of the configuration document.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AlertsConfig, Config, MoverConfig, WatcherConfig};

/// Lower bound of the debounce window, in milliseconds.
pub const MIN_DEBOUNCE_MS: u64 = 100;
/// Upper bound of the debounce window, in milliseconds.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

impl Config {
    /// Check every cross-field constraint the daemon relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint; the daemon must not start.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_watcher(&self.photos.watcher, "photos.watcher")?;
        validate_watcher(&self.media.watcher, "media.watcher")?;

        require_absolute(
            &self.photos.organizer.photos_dir,
            "photos.organizer",
            "photos_dir",
        )?;
        require_absolute(
            &self.media.scanner.quarantine_dir,
            "media.scanner",
            "quarantine_dir",
        )?;

        if self.media.scanner.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidField {
                section: "media.scanner",
                field: "allowed_extensions",
                message: "cannot be empty; every file would be rejected".to_string(),
            });
        }

        validate_mover(&self.media.mover)?;
        validate_alerts(&self.alerts)?;

        Ok(())
    }
}

fn validate_watcher(watcher: &WatcherConfig, section: &'static str) -> ConfigResult<()> {
    if watcher.paths.is_empty() {
        return Err(ConfigError::InvalidField {
            section,
            field: "paths",
            message: "cannot be empty".to_string(),
        });
    }
    for path in &watcher.paths {
        if !path.is_absolute() {
            return Err(ConfigError::InvalidField {
                section,
                field: "paths",
                message: format!("'{}' must be absolute", path.display()),
            });
        }
    }
    if !(MIN_DEBOUNCE_MS..=MAX_DEBOUNCE_MS).contains(&watcher.debounce_ms) {
        return Err(ConfigError::InvalidField {
            section,
            field: "debounce_ms",
            message: format!(
                "must be between {MIN_DEBOUNCE_MS} and {MAX_DEBOUNCE_MS}, got {}",
                watcher.debounce_ms
            ),
        });
    }
    Ok(())
}

fn validate_mover(mover: &MoverConfig) -> ConfigResult<()> {
    if !mover.enabled {
        return Ok(());
    }
    require_absolute(&mover.source, "media.mover", "source")?;
    require_absolute(&mover.destination, "media.mover", "destination")?;
    Ok(())
}

fn validate_alerts(alerts: &AlertsConfig) -> ConfigResult<()> {
    if !alerts.enabled {
        return Ok(());
    }
    if alerts.url.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section: "alerts",
            field: "url",
            message: "required when alerts are enabled".to_string(),
        });
    }
    if alerts.topic.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section: "alerts",
            field: "topic",
            message: "required when alerts are enabled".to_string(),
        });
    }
    Ok(())
}

fn require_absolute(path: &Path, section: &'static str, field: &'static str) -> ConfigResult<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(ConfigError::InvalidField {
            section,
            field,
            message: format!("'{}' must be absolute", path.display()),
        })
    }
}
