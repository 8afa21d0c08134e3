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

//! Debounced filesystem watcher feeding the processing pipelines.
//!
//! # Design
//!
//! - A `notify` watcher forwards raw events into a bounded channel; the async
//!   side keeps a per-path deadline map and promotes a path only after it has
//!   been quiet for the full debounce window.
//! - Wakeups are scheduled against the earliest pending deadline rather than
//!   polled on a fixed interval.
//! - Paths still pending at shutdown are dropped; the startup scan of the next
//!   run rediscovers them.

mod error;
mod watcher;

pub use error::{WatchError, WatchResult};
pub use watcher::run;
