//! Idempotent directory provisioning beneath a mount root.
//!
//! Each missing segment of the requested path is created with the requested
//! mode and then handed to the requested owner. Segments that already exist
//! are left untouched, so re-running after a partial failure picks up where
//! the last run stopped.

use std::fs::{DirBuilder, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use etch_common::{EtchError, EtchResult, EtchPaths, FileMode};

use super::file::apply_ownership;
use crate::request::Ownership;

/// Ensure the absolute directory `dir` exists under `root`.
///
/// # Errors
///
/// - [`EtchError::PathConflict`] if any prefix of `dir` is a non-directory.
/// - [`EtchError::InvalidPath`] if `dir` has no separator or contains `..`.
/// - [`EtchError::Filesystem`] if a stat, mkdir, chmod or chown fails.
pub fn ensure_dir_tree(
    root: &Path,
    dir: &str,
    mode: FileMode,
    owner: Ownership,
) -> EtchResult<()> {
    let segments: Vec<&str> = dir.split('/').collect();
    let invalid = || EtchError::InvalidPath {
        path: dir.to_string(),
    };
    if segments.contains(&"..") {
        return Err(invalid());
    }

    if dir_exists(root, dir)? {
        tracing::debug!(path = dir, "Directory already exists");
        return Ok(());
    }

    if segments.len() == 1 {
        return Err(invalid());
    }

    let mut prefix = PathBuf::from("/");
    for segment in segments.into_iter().filter(|s| !s.is_empty() && *s != ".") {
        prefix.push(segment);
        ensure_dir(root, &prefix, mode, owner)?;
    }

    Ok(())
}

/// Whether `path` exists under `root` as a directory.
///
/// Trailing separators are dropped before the stat so that a file at
/// `/etc/config` is reported as a conflict for `/etc/config/`.
fn dir_exists(root: &Path, path: &str) -> EtchResult<bool> {
    let trimmed = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    let full = EtchPaths::under(root, trimmed);
    let conflict = || EtchError::PathConflict {
        path: PathBuf::from(trimmed),
    };

    match std::fs::metadata(&full) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(conflict()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => Err(conflict()),
        Err(e) => Err(EtchError::filesystem("stat path", trimmed, e)),
    }
}

fn ensure_dir(root: &Path, path: &Path, mode: FileMode, owner: Ownership) -> EtchResult<()> {
    let shown = path.to_string_lossy();
    if dir_exists(root, &shown)? {
        return Ok(());
    }

    let full = EtchPaths::under(root, &shown);

    DirBuilder::new()
        .mode(mode.bits())
        .create(&full)
        .map_err(|e| EtchError::filesystem("create directory", path, e))?;
    // mkdir is filtered through the umask; set the bits we were asked for.
    std::fs::set_permissions(&full, Permissions::from_mode(mode.bits()))
        .map_err(|e| EtchError::filesystem("set mode of directory", path, e))?;

    tracing::info!(path = %shown, %mode, "Created directory");

    apply_ownership(&full, owner)?;
    tracing::info!(
        path = %shown,
        uid = owner.uid,
        gid = owner.gid,
        "Set directory ownership"
    );

    Ok(())
}
