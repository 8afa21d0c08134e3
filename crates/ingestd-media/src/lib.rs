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

//! Media-import-guard pipeline stages.
//!
//! `scanner` applies the layered validation policy to every arriving file
//! and quarantines or deletes what fails it; `mover` hardlinks accepted
//! files into the library tree. Downloads are untrusted input: the policy
//! assumes adversarial content, including executables renamed to media
//! extensions.

mod error;
pub mod mover;
pub mod scanner;

pub use error::{MediaError, MediaResult};
pub use scanner::{ScanVerdict, scan};
