//! Fixed filesystem locations used by etch.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Default mountpoint for the target block device.
pub static ETCH_MOUNTPOINT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("ETCH_MOUNTPOINT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/mountAction"))
});

/// Default scratch file handed to the bootconfig tool.
pub static ETCH_BOOTCONFIG_INPUT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("ETCH_BOOTCONFIG_INPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/userInputBootConfig"))
});

/// Default bootconfig tool.
pub static ETCH_BOOTCONFIG_TOOL: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("ETCH_BOOTCONFIG_TOOL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/usr/bin/bootconfig"))
});

/// Network namespace of the host (PID 1).
pub static ETCH_HOST_NETNS: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("ETCH_HOST_NETNS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/proc/1/ns/net"))
});

/// Locations used during a provisioning run.
#[derive(Debug, Clone)]
pub struct EtchPaths {
    /// Where the block device gets mounted (default: /mountAction).
    pub mountpoint: PathBuf,
    /// Scratch input for the bootconfig tool (default: /userInputBootConfig).
    pub bootconfig_input: PathBuf,
    /// The bootconfig tool itself (default: /usr/bin/bootconfig).
    pub bootconfig_tool: PathBuf,
    /// Namespace file of the host network namespace (default: /proc/1/ns/net).
    pub host_netns: PathBuf,
}

impl EtchPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the mountpoint and bootconfig scratch file under `root`.
    #[must_use]
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            mountpoint: root.join("mountAction"),
            bootconfig_input: root.join("userInputBootConfig"),
            ..Self::default()
        }
    }

    /// Use a different bootconfig tool.
    #[must_use]
    pub fn with_bootconfig_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.bootconfig_tool = tool.into();
        self
    }

    /// Resolve an absolute on-disk path to its location under `root`.
    #[must_use]
    pub fn under(root: &Path, path: &str) -> PathBuf {
        root.join(path.trim_start_matches('/'))
    }
}

impl Default for EtchPaths {
    fn default() -> Self {
        Self {
            mountpoint: ETCH_MOUNTPOINT.clone(),
            bootconfig_input: ETCH_BOOTCONFIG_INPUT.clone(),
            bootconfig_tool: ETCH_BOOTCONFIG_TOOL.clone(),
            host_netns: ETCH_HOST_NETNS.clone(),
        }
    }
}
