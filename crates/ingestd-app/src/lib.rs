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

//! Daemon bootstrap and pipeline supervision.
//!
//! Layout: `bootstrap.rs` (config discovery, logging, signal handling),
//! `supervisor.rs` (stage wiring and drain).

pub mod bootstrap;
mod error;
pub mod supervisor;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
