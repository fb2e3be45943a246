//! Writing the destination file and handing it to its owner.

use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use etch_common::{EtchError, EtchResult, FileMode};

use crate::request::Ownership;

/// Write `contents` to `path`, truncating any existing file, and set `mode`.
///
/// The mode is applied after the write so that an existing file, or the
/// process umask, cannot leave different bits behind.
pub fn write_file(path: &Path, contents: &[u8], mode: FileMode) -> EtchResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode.bits())
        .open(path)
        .map_err(|e| EtchError::filesystem("open file", path, e))?;

    file.write_all(contents)
        .map_err(|e| EtchError::filesystem("write file", path, e))?;
    file.set_permissions(Permissions::from_mode(mode.bits()))
        .map_err(|e| EtchError::filesystem("set mode of file", path, e))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), %mode, "Wrote file");
    Ok(())
}

/// Change the owner of `path`.
pub fn apply_ownership(path: &Path, owner: Ownership) -> EtchResult<()> {
    std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
        .map_err(|e| EtchError::filesystem("change ownership of", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;

    #[test]
    fn write_sets_exact_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");

        write_file(&path, b"hello", FileMode::from_bits(0o666).unwrap()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(std::fs::metadata(&path).unwrap().mode() & 0o7777, 0o666);
    }

    #[test]
    fn rewrite_truncates_and_updates_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");

        write_file(&path, b"a much longer first version", FileMode::from_bits(0o644).unwrap())
            .unwrap();
        write_file(&path, b"short", FileMode::from_bits(0o600).unwrap()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"short");
        assert_eq!(std::fs::metadata(&path).unwrap().mode() & 0o7777, 0o600);
    }

    #[test]
    fn missing_parent_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope/app.conf");

        let err = write_file(&path, b"x", FileMode::from_bits(0o644).unwrap()).unwrap_err();
        assert!(err.to_string().contains("nope/app.conf"));
    }

    #[test]
    fn ownership_to_self_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owned");
        std::fs::write(&path, b"").unwrap();

        let owner = Ownership {
            uid: rustix::process::getuid().as_raw(),
            gid: rustix::process::getgid().as_raw(),
        };
        apply_ownership(&path, owner).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!((meta.uid(), meta.gid()), (owner.uid, owner.gid));
    }

    #[test]
    fn ownership_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Ownership { uid: 0, gid: 0 };

        let err = apply_ownership(&dir.path().join("missing"), owner).unwrap_err();
        assert!(matches!(err, EtchError::Filesystem { .. }));
    }
}
