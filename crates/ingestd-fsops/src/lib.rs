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

//! Crash-safe filesystem primitives shared by both pipelines.
//!
//! Moves prefer `rename` and fall back to copy + fsync + remove-source across
//! filesystem boundaries, cleaning up a partial destination on failure. Name
//! collisions are resolved by suffix probing with a hard cap. The filesystem
//! itself is the synchronization point for collision probes; no lock is held
//! between the existence check and the move.

pub mod error;

pub use error::{FsOpsError, FsOpsResult};

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;

#[cfg(unix)]
use nix::unistd::{Gid, Group, Uid, User, chown};

/// Upper bound of the collision-suffix probe. Beyond this the caller gets an
/// explicit error instead of an unbounded linear scan.
pub const MAX_COLLISION_SUFFIX: u32 = 1_000;

const COMPARE_CHUNK: usize = 64 * 1024;

/// Find an unused path for `file_name` inside `dir`.
///
/// The first candidate is `dir/file_name`; collisions append `_1`, `_2`, …
/// before the extension, taking the lowest unused suffix. The probe stats
/// synchronously and runs on the blocking pool.
///
/// # Errors
///
/// Returns [`FsOpsError::TooManyCollisions`] once [`MAX_COLLISION_SUFFIX`]
/// candidates have been probed without finding a free name.
pub async fn collision_free_path(dir: &Path, file_name: &OsStr) -> FsOpsResult<PathBuf> {
    let dir = dir.to_path_buf();
    let file_name = file_name.to_os_string();
    tokio::task::spawn_blocking(move || probe_collision_free(&dir, &file_name))
        .await
        .map_err(|_| FsOpsError::TaskPanicked {
            operation: "collision_free_path",
        })?
}

fn probe_collision_free(dir: &Path, file_name: &OsStr) -> FsOpsResult<PathBuf> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let name = file_name.to_string_lossy();
    let (stem, extension) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name.as_ref(), None),
    };

    for suffix in 1..=MAX_COLLISION_SUFFIX {
        let probe = extension.map_or_else(
            || format!("{stem}_{suffix}"),
            |ext| format!("{stem}_{suffix}.{ext}"),
        );
        let candidate = dir.join(&probe);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(FsOpsError::TooManyCollisions {
        dir: dir.to_path_buf(),
        file_name: name.into_owned(),
    })
}

/// Compare two files byte for byte.
///
/// # Errors
///
/// Returns an error when either file cannot be opened or read.
pub async fn files_identical(a: &Path, b: &Path) -> FsOpsResult<bool> {
    let meta_a = tokio::fs::metadata(a)
        .await
        .map_err(|source| FsOpsError::io("files_identical.stat", a, source))?;
    let meta_b = tokio::fs::metadata(b)
        .await
        .map_err(|source| FsOpsError::io("files_identical.stat", b, source))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut file_a = tokio::fs::File::open(a)
        .await
        .map_err(|source| FsOpsError::io("files_identical.open", a, source))?;
    let mut file_b = tokio::fs::File::open(b)
        .await
        .map_err(|source| FsOpsError::io("files_identical.open", b, source))?;

    let mut buf_a = vec![0_u8; COMPARE_CHUNK];
    let mut buf_b = vec![0_u8; COMPARE_CHUNK];
    loop {
        let read_a = file_a
            .read(&mut buf_a)
            .await
            .map_err(|source| FsOpsError::io("files_identical.read", a, source))?;
        if read_a == 0 {
            return Ok(true);
        }
        let mut filled = 0;
        while filled < read_a {
            let read_b = file_b
                .read(&mut buf_b[filled..read_a])
                .await
                .map_err(|source| FsOpsError::io("files_identical.read", b, source))?;
            if read_b == 0 {
                return Ok(false);
            }
            filled += read_b;
        }
        if buf_a[..read_a] != buf_b[..read_a] {
            return Ok(false);
        }
    }
}

/// Move `source` to `dest`, creating parent directories.
///
/// `rename` only works within one filesystem; across devices the data is
/// copied, fsynced, and only then is the source removed. A failed copy leaves
/// no partial destination behind.
///
/// # Errors
///
/// Returns an error when any step of the move fails.
pub async fn move_file(source: &Path, dest: &Path) -> FsOpsResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source_err| FsOpsError::io("move_file.create_parent", parent, source_err))?;
    }

    if tokio::fs::rename(source, dest).await.is_ok() {
        return Ok(());
    }

    if let Err(copy_err) = tokio::fs::copy(source, dest).await {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(FsOpsError::io("move_file.copy", dest, copy_err));
    }

    if let Err(sync_err) = sync_file(dest).await {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(sync_err);
    }

    tokio::fs::remove_file(source)
        .await
        .map_err(|source_err| FsOpsError::io("move_file.remove_source", source, source_err))?;
    Ok(())
}

/// Hardlink `source` to `dest`, falling back to a full copy across devices.
/// The source is never removed; its cleanup belongs to whoever produced it.
///
/// # Errors
///
/// Returns an error when both the link and the copy fail.
pub async fn hardlink_or_copy(source: &Path, dest: &Path) -> FsOpsResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source_err| {
                FsOpsError::io("hardlink_or_copy.create_parent", parent, source_err)
            })?;
    }

    if tokio::fs::hard_link(source, dest).await.is_ok() {
        return Ok(());
    }

    if let Err(copy_err) = tokio::fs::copy(source, dest).await {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(FsOpsError::io("hardlink_or_copy.copy", dest, copy_err));
    }
    sync_file(dest).await
}

/// Apply owner and/or group to a single path.
///
/// # Errors
///
/// Returns an error when a principal cannot be resolved or the chown fails.
#[cfg(unix)]
pub async fn apply_ownership(
    path: &Path,
    owner: Option<&str>,
    group: Option<&str>,
) -> FsOpsResult<()> {
    let uid = owner.map(resolve_owner).transpose()?;
    let gid = group.map(resolve_group).transpose()?;
    if uid.is_none() && gid.is_none() {
        return Ok(());
    }

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        chown(&target, uid, gid).map_err(|source| FsOpsError::Chown {
            path: target.clone(),
            source,
        })
    })
    .await
    .map_err(|_| FsOpsError::TaskPanicked {
        operation: "apply_ownership",
    })?
}

/// Ownership changes are unix-only; elsewhere configured owner/group is a no-op.
#[cfg(not(unix))]
pub async fn apply_ownership(
    _path: &Path,
    _owner: Option<&str>,
    _group: Option<&str>,
) -> FsOpsResult<()> {
    Ok(())
}

/// Remove directories left empty between `start` and `root`, walking upward.
/// `root` itself is never removed. Returns how many directories were pruned.
///
/// # Errors
///
/// Returns an error when a directory listing fails for a reason other than
/// the directory having disappeared.
pub fn prune_empty_dirs(start: &Path, root: &Path) -> FsOpsResult<usize> {
    let mut removed = 0;
    let mut current = start.to_path_buf();

    while current.starts_with(root) && current != root {
        let is_empty = match std::fs::read_dir(&current) {
            Ok(mut entries) => entries.next().is_none(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => return Err(FsOpsError::io("prune_empty_dirs.read_dir", &current, err)),
        };
        if !is_empty {
            break;
        }
        std::fs::remove_dir(&current)
            .map_err(|err| FsOpsError::io("prune_empty_dirs.remove_dir", &current, err))?;
        removed += 1;
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    Ok(removed)
}

async fn sync_file(path: &Path) -> FsOpsResult<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> FsOpsResult<()> {
        let file = std::fs::File::open(&target)
            .map_err(|source| FsOpsError::io("sync_file.open", &target, source))?;
        file.sync_all()
            .map_err(|source| FsOpsError::io("sync_file.sync", &target, source))?;
        Ok(())
    })
    .await
    .map_err(|_| FsOpsError::TaskPanicked {
        operation: "sync_file",
    })?
}

#[cfg(unix)]
fn resolve_owner(spec: &str) -> FsOpsResult<Uid> {
    let trimmed = spec.trim();
    if let Ok(id) = trimmed.parse::<u32>() {
        return Ok(Uid::from_raw(id));
    }
    let user = User::from_name(trimmed)
        .map_err(|source| FsOpsError::UserLookup {
            user: trimmed.to_string(),
            source,
        })?
        .ok_or_else(|| FsOpsError::UnknownPrincipal {
            kind: "user",
            name: trimmed.to_string(),
        })?;
    Ok(user.uid)
}

#[cfg(unix)]
fn resolve_group(spec: &str) -> FsOpsResult<Gid> {
    let trimmed = spec.trim();
    if let Ok(id) = trimmed.parse::<u32>() {
        return Ok(Gid::from_raw(id));
    }
    let group = Group::from_name(trimmed)
        .map_err(|source| FsOpsError::GroupLookup {
            group: trimmed.to_string(),
            source,
        })?
        .ok_or_else(|| FsOpsError::UnknownPrincipal {
            kind: "group",
            name: trimmed.to_string(),
        })?;
    Ok(group.gid)
}
