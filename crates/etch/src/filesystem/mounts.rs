//! Block device mounting.

use std::ffi::CString;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use etch_common::{EtchError, EtchResult};

/// Mode of the mountpoint directory when etch has to create it.
const MOUNTPOINT_MODE: u32 = 0o755;

/// A mounted block device.
///
/// The mount stays in place for the lifetime of the process; nothing is
/// unmounted on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountHandle {
    /// The block device.
    pub device: String,
    /// Filesystem type it was mounted with.
    pub fs_type: String,
    /// Where it is mounted.
    pub mountpoint: PathBuf,
}

impl MountHandle {
    /// Root that destination paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.mountpoint
    }
}

/// Create `mountpoint` if needed and mount `device` on it.
///
/// The mount uses no flags and no data string.
pub fn mount_device(device: &str, fs_type: &str, mountpoint: &Path) -> EtchResult<MountHandle> {
    use rustix::mount::{MountFlags, mount};

    ensure_mountpoint(mountpoint)?;

    tracing::debug!(
        device,
        fs_type,
        target = %mountpoint.display(),
        "Mounting block device"
    );

    let fstype_c = CString::new(fs_type)
        .map_err(|_| EtchError::validation(format!("invalid filesystem type {fs_type:?}")))?;

    mount(
        device,
        mountpoint,
        fstype_c.as_c_str(),
        MountFlags::empty(),
        None,
    )
    .map_err(|e| EtchError::Mount {
        device: device.to_string(),
        target: mountpoint.to_path_buf(),
        source: e.into(),
    })?;

    tracing::info!(device, target = %mountpoint.display(), "Mounted block device");

    Ok(MountHandle {
        device: device.to_string(),
        fs_type: fs_type.to_string(),
        mountpoint: mountpoint.to_path_buf(),
    })
}

/// Create the mountpoint directory unless it already exists.
fn ensure_mountpoint(mountpoint: &Path) -> EtchResult<()> {
    match std::fs::DirBuilder::new()
        .mode(MOUNTPOINT_MODE)
        .create(mountpoint)
    {
        Ok(()) => {
            tracing::debug!(path = %mountpoint.display(), "Created mountpoint");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && mountpoint.is_dir() => Ok(()),
        Err(e) => Err(EtchError::filesystem("create mountpoint", mountpoint, e)),
    }
}
