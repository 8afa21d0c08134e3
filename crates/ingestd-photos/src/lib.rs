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

//! Photo-organizing pipeline stages.
//!
//! Three stages connected by bounded channels: `metadata` classifies a file
//! and derives its capture time, `organizer` moves it into the date-bucketed
//! tree (emitting the terminal event), and `nextcloud` triggers an
//! incremental rescan for each placed file. The rescan is best-effort; a
//! failed rescan never changes a file's terminal outcome.

mod error;
pub mod metadata;
pub mod nextcloud;
pub mod organizer;

pub use error::{PhotosError, PhotosResult};
pub use metadata::{CaptureTime, ClassifiedFile, DatetimeSource, MediaKind};
