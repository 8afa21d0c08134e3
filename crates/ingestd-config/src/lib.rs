#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! TOML-backed daemon configuration.
//!
//! Layout: `model.rs` (typed configuration sections), `loader.rs`
//! (`Config::load`), `validate.rs` (startup validation — an invalid document
//! is fatal; the daemon refuses to run rather than guess).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    AlertsConfig, Config, MediaConfig, MoverConfig, NextcloudConfig, OrganizerConfig,
    PhotosConfig, ScannerConfig, WatcherConfig,
};
pub use validate::{MAX_DEBOUNCE_MS, MIN_DEBOUNCE_MS};
